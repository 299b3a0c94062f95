use std::path::PathBuf;

use dicom_slice_viewer::{SortBy, StudyLoader, ViewerSession};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .try_init();

    let mut args = std::env::args().skip(1);
    let folder = PathBuf::from(args.next().unwrap_or_else(|| "dicom".to_string()));
    let window: Vec<i32> = args.filter_map(|arg| arg.parse().ok()).collect();

    let study = StudyLoader::load_from_directory(&folder, SortBy::InstanceNumber)
        .expect("should have loaded files from directory");
    let mut viewer = ViewerSession::new();
    for key in viewer.load_study(study) {
        println!("session {key}");
    }

    if let &[level, width] = window.as_slice() {
        viewer
            .set_window(level, width)
            .expect("should have applied window");
    }

    let slice = viewer.current_slice().expect("study should not be empty");
    let (width, height) = slice.dim();
    let (x0, y0) = (width / 4, height / 4);
    let (x1, y1) = (x0 + width / 2, y0 + height / 2);
    viewer
        .pointer_down(x0 as i32, y0 as i32)
        .expect("should have started selection");
    viewer
        .pointer_up(x1 as i32, y1 as i32)
        .expect("should have finished selection");

    let rect = viewer.selection().expect("selection should be finalized");
    let stats = viewer
        .submit_region_stats()
        .expect("study should not be empty")
        .expect("selection should be finalized")
        .await
        .expect("selection should be valid")
        .expect("view should not have changed");
    let label = slice.label();
    println!("{label} {rect:?}: {stats}");

    let frame = viewer.render().expect("should have rendered current slice");
    frame.display.save("result.png").expect("should have written result.png");
}
