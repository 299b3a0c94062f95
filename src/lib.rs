//! # DICOM slice viewer library
//!
//! This crate is the numeric engine behind an interactive DICOM slice
//! viewer: it windows raw (Hounsfield-like) pixel values into displayable
//! intensities and computes live statistics over a rectangular region of
//! interest drawn on a slice.
//!
//! Studies are handed over as a hierarchy of sessions, series and ordered
//! slices. A [`ViewerSession`] keeps track of the slice being shown, the
//! current window level/width and the selection rectangle, and produces
//! frames for the display collaborator:
//!  - a windowed 8-bit display buffer
//!  - an optional overlay rectangle
//!  - optional region statistics (area, mean, standard deviation)
//!
//! Full-slice windowing runs in parallel using rayon. Hosts that want to keep
//! their UI thread free can run jobs through a [`BackgroundWorker`], which
//! discards results that were superseded by a newer request.
//!
//! The [`StudyLoader`] reads DICOM files or a folder tree with dicom-rs and
//! groups them by StudyInstanceUID and SeriesInstanceUID. Only the first
//! frame of each file is used.
//!
//! # Examples
//!
//! ## Windowing a folder and measuring a region
//!
//! ```no_run
//! # use dicom_slice_viewer::{StudyLoader, SortBy, ViewerSession};
//! let study = StudyLoader::load_from_directory("dicom", SortBy::InstanceNumber)
//!     .expect("should have loaded files from directory");
//! let mut viewer = ViewerSession::new();
//! viewer.load_study(study);
//! viewer.set_window(40, 400).expect("study is loaded");
//!
//! viewer.pointer_down(10, 10).expect("study is loaded");
//! let overlay = viewer
//!     .pointer_up(40, 30)
//!     .expect("study is loaded")
//!     .expect("selection was started inside the image");
//! println!("{}", overlay.statistics);
//!
//! let frame = viewer.render().expect("study is loaded");
//! frame.display.save("result.png").expect("should have written png");
//! ```

pub mod config;
pub mod enums;
pub mod error;
pub mod region_stats;
pub mod selection;
pub mod slice;
pub mod slice_store;
pub mod study_loader;
pub mod viewer;
pub mod window_mapper;
pub mod worker;

pub use config::{DISPLAY_MAX, ViewerConfig};
pub use enums::{SortBy, ViewerEvent};
pub use error::ViewerError;
pub use region_stats::{RegionStatistics, region_stats};
pub use selection::{SelectionController, SelectionRect, SelectionState};
pub use slice::Slice;
pub use slice_store::{Series, Session, SliceStore, Study};
pub use study_loader::{StudyLoader, StudyLoaderError};
pub use viewer::{Frame, Overlay, PixelProbe, ViewerSession, ViewerUpdate};
pub use window_mapper::{WindowMapper, WindowSetting};
pub use worker::BackgroundWorker;
