use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::io::Error;

use derive_setters::Setters;

// Errors that can surface before the dashboard is up. Once running, the
// view-state operations never fail (invalid input is clamped or ignored).
#[derive(Debug)]
pub enum DashError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound(String),
    PermissionDenied(String),
    UnknownFileType(String),
    MissingColumn(String),
}

impl From<Error> for DashError {
    fn from(err: Error) -> Self {
        DashError::IoError(err)
    }
}

impl From<PolarsError> for DashError {
    fn from(err: PolarsError) -> Self {
        DashError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct DashConfig {
    /// How long the controller waits for a key event per loop iteration.
    pub event_poll_time: u64,
    /// Quiescence window before a typed filter is applied.
    pub debounce_ms: u64,
    /// Rows per table page.
    pub page_size: usize,
    /// Initial text filter, the `?q=` analogue.
    pub query: Option<String>,
}

impl Default for DashConfig {
    fn default() -> Self {
        DashConfig {
            event_poll_time: 100,
            debounce_ms: 250,
            page_size: 10,
            query: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GrowPageSize,
    ShrinkPageSize,
    CycleSort,
    CycleTieBreak,
    ColumnMenu,
    Filter,
    SwitchScreen,
    CopyCell,
    CopyRow,
    Toggle,
    Enter,
    Exit,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
shopdash keys

  Tab        switch between Products and Orders
  j/k, Down/Up   move row selection
  h/l, Left/Right   move column selection
  n/p        next / previous page
  g/G        first / last page
  ]/[        grow / shrink page size
  s          cycle sort on selected column (asc, desc, off)
  S          cycle selected column as tie-break criterion
  v          column visibility menu (Space toggles)
  /          filter (typing applies after a short pause)
  Enter      open record details (Left/Right steps records)
  y/Y        copy cell / copy row
  ?          this help
  q          quit
";
