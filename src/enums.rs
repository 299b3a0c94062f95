/// Ordering applied to the slices of each series when loading a study.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    InstanceNumber,
    ImagePositionPatient,
    None,
}

/// Input events from the host UI. Pointer coordinates are slice-local pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    PointerDown { x: i32, y: i32 },
    PointerMove { x: i32, y: i32 },
    PointerUp { x: i32, y: i32 },
    SliceIndexChanged(usize),
    SessionChanged(String),
    SeriesChanged(String),
    WindowChanged { level: i32, width: i32 },
    ClearSelection,
}
