use crate::{enums::SortBy, slice::Slice, slice_store::Study};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, s};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudyLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Could not decode pixel data: {0}")]
    Decode(String),
}

/// One decoded file, before grouping.
struct LoadedImage {
    study_uid: String,
    series_uid: String,
    order: Option<f32>,
    slice: Slice,
}

/// Reference ingest collaborator: reads DICOM files into a [`Study`]
/// grouped by StudyInstanceUID and SeriesInstanceUID.
pub struct StudyLoader;

impl StudyLoader {
    /// Load a study from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - (label, object) pairs; the label becomes the slice label
    /// * `sort_by` - Method to sort the slices of each series
    ///
    /// # Errors
    ///
    /// Returns error if no object yields a decodable image
    pub fn load_from_dicom_objects(
        dicom_objects: Vec<(String, FileDicomObject<InMemDicomObject>)>,
        sort_by: SortBy,
    ) -> Result<Study, StudyLoaderError> {
        let images: Vec<_> = dicom_objects
            .into_par_iter()
            .filter_map(|(label, object)| match Self::extract_image(label, &object, sort_by) {
                Ok(image) => Some(image),
                Err(err) => {
                    log::warn!("Skipping image: {err}");
                    None
                }
            })
            .collect();

        Self::group(images, sort_by)
    }

    /// Load a study from file paths
    ///
    /// # Arguments
    ///
    /// * `paths` - DICOM files; each file name becomes the slice label
    /// * `sort_by` - Method to sort the slices of each series
    ///
    /// # Errors
    ///
    /// Returns error if none of the files yields a decodable image.
    /// Files that cannot be opened or decoded are skipped with a warning.
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<Study, StudyLoaderError> {
        let images: Vec<_> = paths
            .par_iter()
            .filter_map(|path| {
                let path = path.as_ref();
                match Self::load_file(path, sort_by) {
                    Ok(image) => Some(image),
                    Err(err) => {
                        log::warn!("{}: {err}", path.display());
                        None
                    }
                }
            })
            .collect();

        log::info!("Decoded {} of {} file(s)", images.len(), paths.len());
        Self::group(images, sort_by)
    }

    /// Load every .dcm file below a directory, descending into subfolders
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to search
    /// * `sort_by` - Method to sort the slices of each series
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be read, contains no .dcm files
    /// or none of them yields a decodable image
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Study, StudyLoaderError> {
        let mut paths = Vec::new();
        Self::collect_dcm_files(path.as_ref(), &mut paths)?;
        paths.sort();

        if paths.is_empty() {
            return Err(StudyLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    fn collect_dcm_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), StudyLoaderError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_dcm_files(&path, paths)?;
            } else if path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            {
                paths.push(path);
            }
        }
        Ok(())
    }

    fn load_file(path: &Path, sort_by: SortBy) -> Result<LoadedImage, StudyLoaderError> {
        let object = open_file(path)?;
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::extract_image(label, &object, sort_by)
    }

    fn extract_image(
        label: String,
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Result<LoadedImage, StudyLoaderError> {
        let pixels = Self::decode_image(dicom_object)?;
        Ok(LoadedImage {
            study_uid: Self::text(dicom_object, tags::STUDY_INSTANCE_UID),
            series_uid: Self::text(dicom_object, tags::SERIES_INSTANCE_UID),
            order: Self::get_sort_order(dicom_object, sort_by),
            slice: Slice::new(label, pixels),
        })
    }

    fn text(dicom_object: &FileDicomObject<InMemDicomObject>, tag: dicom::core::Tag) -> String {
        dicom_object
            .element(tag)
            .ok()
            .and_then(|element| element.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<f32> {
        match sort_by {
            SortBy::ImagePositionPatient => dicom_object
                .element(tags::IMAGE_POSITION_PATIENT)
                .ok()?
                .to_multi_float32()
                .ok()?
                .get(2)
                .copied(),
            SortBy::InstanceNumber => dicom_object
                .element(tags::INSTANCE_NUMBER)
                .ok()?
                .to_int::<i32>()
                .ok()
                .map(|n| n as f32),
            SortBy::None => None,
        }
    }

    /// First frame with the modality LUT applied and no VOI transform,
    /// rounded to integer Hounsfield-like values.
    fn decode_image(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Array2<i32>, StudyLoaderError> {
        let pixel_data = dicom_object
            .decode_pixel_data()
            .map_err(|err| StudyLoaderError::Decode(err.to_string()))?;
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::Default)
            .with_voi_lut(VoiLutOption::Identity);
        let array = pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .map_err(|err| StudyLoaderError::Decode(err.to_string()))?;
        Ok(array.slice_move(s![0, .., .., 0]).mapv(|v| v.round() as i32))
    }

    fn group(mut images: Vec<LoadedImage>, sort_by: SortBy) -> Result<Study, StudyLoaderError> {
        if images.is_empty() {
            return Err(StudyLoaderError::NoValidImages);
        }

        // stable, so equal or missing keys keep file order
        match sort_by {
            SortBy::InstanceNumber => images.sort_by(|a, b| Self::compare_order(a.order, b.order)),
            SortBy::ImagePositionPatient => {
                images.sort_by(|a, b| Self::compare_order(b.order, a.order))
            }
            SortBy::None => {}
        }

        let mut study = Study::new();
        for image in images {
            study.push_slice(&image.study_uid, &image.series_uid, image.slice);
        }
        Ok(study)
    }

    fn compare_order(a: Option<f32>, b: Option<f32>) -> std::cmp::Ordering {
        a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(study: &str, series: &str, order: Option<f32>, label: &str) -> LoadedImage {
        LoadedImage {
            study_uid: study.to_string(),
            series_uid: series.to_string(),
            order,
            slice: Slice::new(label, Array2::zeros((1, 1))),
        }
    }

    fn labels(study: &Study, session: usize, series: usize) -> Vec<String> {
        study.sessions()[session].series()[series]
            .slices()
            .iter()
            .map(|slice| slice.label().to_string())
            .collect()
    }

    #[test]
    fn groups_by_study_and_series() {
        let study = StudyLoader::group(
            vec![
                image("1.2", "1.2.1", Some(2.0), "b.dcm"),
                image("1.3", "1.3.1", Some(1.0), "c.dcm"),
                image("1.2", "1.2.1", Some(1.0), "a.dcm"),
                image("1.2", "1.2.2", Some(1.0), "d.dcm"),
            ],
            SortBy::InstanceNumber,
        )
        .unwrap();

        assert_eq!(study.session_keys(), vec!["1.2", "1.3"]);
        assert_eq!(study.sessions()[0].series_keys(), vec!["1.2.1", "1.2.2"]);
        assert_eq!(labels(&study, 0, 0), vec!["a.dcm", "b.dcm"]);
    }

    #[test]
    fn image_position_sorts_descending() {
        let study = StudyLoader::group(
            vec![
                image("s", "r", Some(-10.0), "low.dcm"),
                image("s", "r", Some(30.0), "high.dcm"),
                image("s", "r", Some(10.0), "mid.dcm"),
            ],
            SortBy::ImagePositionPatient,
        )
        .unwrap();
        assert_eq!(labels(&study, 0, 0), vec!["high.dcm", "mid.dcm", "low.dcm"]);
    }

    #[test]
    fn unsorted_keeps_input_order() {
        let study = StudyLoader::group(
            vec![
                image("s", "r", Some(3.0), "x.dcm"),
                image("s", "r", Some(1.0), "y.dcm"),
            ],
            SortBy::None,
        )
        .unwrap();
        assert_eq!(labels(&study, 0, 0), vec!["x.dcm", "y.dcm"]);
    }

    #[test]
    fn no_images_is_an_error() {
        assert!(matches!(
            StudyLoader::group(Vec::new(), SortBy::InstanceNumber),
            Err(StudyLoaderError::NoValidImages)
        ));
    }

    #[test]
    fn ct_small_decodes_to_hounsfield_values() {
        let path = dicom_test_files::path("pydicom/CT_small.dcm").unwrap();
        let study = StudyLoader::load_from_file_paths(&[&path], SortBy::InstanceNumber).unwrap();

        let object = open_file(&path).unwrap();
        let uid = |tag| {
            object
                .element(tag)
                .unwrap()
                .to_str()
                .unwrap()
                .trim()
                .to_string()
        };
        assert_eq!(study.session_keys(), vec![uid(tags::STUDY_INSTANCE_UID)]);
        assert_eq!(
            study.sessions()[0].series_keys(),
            vec![uid(tags::SERIES_INSTANCE_UID)]
        );

        let slice = &study.sessions()[0].series()[0].slices()[0];
        assert_eq!(slice.label(), "CT_small.dcm");
        assert_eq!(slice.dim(), (128, 128));
        assert!(slice.value_range().0 < 0);

        // rescale intercept -1024, slope 1
        let raw = object
            .decode_pixel_data()
            .unwrap()
            .to_ndarray_with_options::<f32>(
                &ConvertOptions::new()
                    .with_modality_lut(ModalityLutOption::None)
                    .with_voi_lut(VoiLutOption::Identity),
            )
            .unwrap();
        for (x, y) in [(0, 0), (64, 64), (127, 5), (30, 100)] {
            assert_eq!(
                slice.value_at(x, y),
                Some(raw[[0, y, x, 0]].round() as i32 - 1024),
                "pixel ({x}, {y})"
            );
        }
    }

    #[test]
    fn directory_without_dicom_files() {
        let dir = std::env::temp_dir().join(format!("dicom-slice-viewer-{}", std::process::id()));
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested").join("notes.txt"), b"not dicom").unwrap();

        let result = StudyLoader::load_from_directory(&dir, SortBy::InstanceNumber);
        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(result, Err(StudyLoaderError::NoValidImages)));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = std::env::temp_dir().join(format!("dicom-slice-viewer-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("broken.DCM"), b"garbage").unwrap();

        let result = StudyLoader::load_from_directory(&dir, SortBy::InstanceNumber);
        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(result, Err(StudyLoaderError::NoValidImages)));
    }
}
