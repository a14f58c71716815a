use crate::error::{Error, Result};
use std::io::Write;

// ===== Resize Passes =====

/// A structural pass run by the resize engine
///
/// The engine decides pass ordering and count; this enumeration only exists
/// to label progress output. Raw ids are kept alongside so engines that grow
/// new passes keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Pass {
    ExtendInodeTable = 1,
    RelocateBlocks = 2,
    ScanInodeTable = 3,
    UpdateInodeRefs = 4,
    MoveInodeTable = 5,
}

impl Pass {
    /// Map a raw engine pass id to a known pass
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::ExtendInodeTable),
            2 => Some(Self::RelocateBlocks),
            3 => Some(Self::ScanInodeTable),
            4 => Some(Self::UpdateInodeRefs),
            5 => Some(Self::MoveInodeTable),
            _ => None,
        }
    }

    /// Raw pass id as reported by the engine
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Human-readable pass label
    pub fn label(self) -> &'static str {
        match self {
            Self::ExtendInodeTable => "Extending the inode table",
            Self::RelocateBlocks => "Relocating blocks",
            Self::ScanInodeTable => "Scanning inode table",
            Self::UpdateInodeRefs => "Updating inode references",
            Self::MoveInodeTable => "Moving inode table",
        }
    }
}

/// Label for a raw pass id, with a fallback for passes this tool predates
pub fn pass_label(id: u32) -> &'static str {
    match Pass::from_id(id) {
        Some(pass) => pass.label(),
        None => "Unknown pass",
    }
}

// ===== Progress Meter =====

/// Width of the label field, matching the classic resizer output
pub const LABEL_WIDTH: usize = 30;

/// Width of the progress bar in characters
pub const BAR_WIDTH: usize = 40;

/// Scoped display for a single pass
///
/// Opened when a pass starts, closed when it completes. `close` consumes the
/// meter, so a closed meter cannot be touched again.
#[derive(Debug)]
pub struct ProgressMeter {
    label: String,
    label_width: usize,
    bar_width: usize,
    max: u64,
    cur: u64,
}

impl ProgressMeter {
    /// Open a meter for a pass with `max` work units
    pub fn open(label: &str, label_width: usize, bar_width: usize, max: u64) -> Result<Self> {
        if max == 0 || bar_width == 0 {
            return Err(Error::Display(format!(
                "meter needs max > 0 and a bar width (max={}, width={})",
                max, bar_width
            )));
        }
        let meter = Self {
            label: label.to_string(),
            label_width,
            bar_width,
            max,
            cur: 0,
        };
        meter.render();
        Ok(meter)
    }

    /// Current position, clamped to [0, max]
    pub fn cur(&self) -> u64 {
        self.cur
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Advance the meter to `cur` and redraw
    pub fn update(&mut self, cur: u64) {
        self.cur = cur.min(self.max);
        self.render();
    }

    /// Finish the line and release the display
    pub fn close(mut self) {
        self.cur = self.max;
        self.render();
        eprintln!();
    }

    fn render(&self) {
        let filled = (self.cur as u128 * self.bar_width as u128 / self.max as u128) as usize;
        let percent = self.cur as f64 * 100.0 / self.max as f64;
        eprint!(
            "\r{:<label_width$}|{}{}| {:5.1}%",
            self.label,
            "X".repeat(filled),
            "-".repeat(self.bar_width - filled),
            percent,
            label_width = self.label_width,
        );
        let _ = std::io::stderr().flush();
    }
}

// ===== Progress State =====

/// Per-resize progress bookkeeping, mutated only inside the callback
///
/// Owned by the orchestrator and captured by the progress closure; there is
/// no process-wide meter slot. At most one meter is live at a time: starting
/// a new pass closes any prior meter first.
#[derive(Debug, Default)]
pub struct ProgressState {
    active_pass: Option<u32>,
    meter: Option<ProgressMeter>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw id of the pass currently in progress, if any
    pub fn active_pass(&self) -> Option<u32> {
        self.active_pass
    }

    /// True while a meter is being displayed
    pub fn has_meter(&self) -> bool {
        self.meter.is_some()
    }

    #[cfg(test)]
    pub(crate) fn meter_cur(&self) -> Option<u64> {
        self.meter.as_ref().map(|m| m.cur())
    }

    /// Apply one progress quantum from the engine
    ///
    /// `max == 0` carries no progress and is ignored; it is never treated as
    /// a pass boundary. `cur == 0` starts a new pass; `cur >= max` completes
    /// the active one. Meter allocation failure disables display for the
    /// pass but the pass still counts as active. Display problems never
    /// fail the resize, so this is infallible.
    pub fn observe(&mut self, pass: u32, cur: u64, max: u64) {
        if max == 0 {
            return;
        }
        if cur == 0 {
            if let Some(meter) = self.meter.take() {
                meter.close();
            }
            self.active_pass = Some(pass);
            eprintln!("Begin pass {} (max = {})", pass, max);
            self.meter = ProgressMeter::open(pass_label(pass), LABEL_WIDTH, BAR_WIDTH, max).ok();
        }
        if let Some(meter) = self.meter.as_mut() {
            meter.update(cur);
        }
        if cur >= max {
            if let Some(meter) = self.meter.take() {
                meter.close();
            }
            self.active_pass = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_labels() {
        assert_eq!(pass_label(1), "Extending the inode table");
        assert_eq!(pass_label(2), "Relocating blocks");
        assert_eq!(pass_label(5), "Moving inode table");
        // Forward-compatible fallback, never an error
        assert_eq!(pass_label(99), "Unknown pass");
        assert_eq!(pass_label(0), "Unknown pass");
    }

    #[test]
    fn test_pass_round_trip() {
        for id in 1..=5 {
            assert_eq!(Pass::from_id(id).unwrap().id(), id);
        }
        assert!(Pass::from_id(6).is_none());
    }

    #[test]
    fn test_meter_requires_max() {
        assert!(ProgressMeter::open("label", 30, 40, 0).is_err());
        assert!(ProgressMeter::open("label", 30, 40, 100).is_ok());
    }

    #[test]
    fn test_meter_clamps_update() {
        let mut meter = ProgressMeter::open("label", 30, 40, 100).unwrap();
        meter.update(250);
        assert_eq!(meter.cur(), 100);
        meter.close();
    }

    #[test]
    fn test_state_single_pass_lifecycle() {
        let mut state = ProgressState::new();

        // Pass start
        state.observe(2, 0, 100);
        assert_eq!(state.active_pass(), Some(2));
        assert!(state.has_meter());

        // Intermediate updates
        state.observe(2, 40, 100);
        assert_eq!(state.meter_cur(), Some(40));
        state.observe(2, 90, 100);
        assert_eq!(state.meter_cur(), Some(90));

        // Completion resets to idle
        state.observe(2, 100, 100);
        assert_eq!(state.active_pass(), None);
        assert!(!state.has_meter());
    }

    #[test]
    fn test_state_max_zero_is_noop() {
        let mut state = ProgressState::new();
        state.observe(1, 0, 0);
        assert_eq!(state.active_pass(), None);
        assert!(!state.has_meter());

        // Also mid-pass: no progress quantum, not a pass boundary
        state.observe(1, 0, 100);
        state.observe(1, 0, 0);
        assert_eq!(state.active_pass(), Some(1));
        assert!(state.has_meter());
    }

    #[test]
    fn test_state_new_pass_closes_prior_meter() {
        let mut state = ProgressState::new();
        state.observe(1, 0, 100);
        assert_eq!(state.active_pass(), Some(1));

        // Engine starts the next pass without finishing the first; the old
        // meter must be closed before the new one opens.
        state.observe(2, 0, 50);
        assert_eq!(state.active_pass(), Some(2));
        assert!(state.has_meter());
        assert_eq!(state.meter_cur(), Some(0));
    }

    #[test]
    fn test_state_unknown_pass_still_tracked() {
        let mut state = ProgressState::new();
        state.observe(42, 0, 10);
        assert_eq!(state.active_pass(), Some(42));
        assert!(state.has_meter());
        state.observe(42, 10, 10);
        assert_eq!(state.active_pass(), None);
    }

    #[test]
    fn test_state_single_quantum_pass() {
        // cur == 0 with max reached in the same call: open then close
        let mut state = ProgressState::new();
        state.observe(3, 0, 1);
        assert_eq!(state.active_pass(), Some(3));
        state.observe(3, 1, 1);
        assert_eq!(state.active_pass(), None);
        assert!(!state.has_meter());
    }
}
