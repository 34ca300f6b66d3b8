use serde::Deserialize;

/// Interpretation context of the input dispatcher. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Visual,
    Index,
    AddMarker,
    EvalMarker,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Insert => "-- INSERT --",
            Mode::Visual => "-- VISUAL --",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Next rotation clockwise by a quarter turn.
    pub fn rotated(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustMode {
    #[default]
    BestFit,
    Width,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GotoMode {
    #[default]
    Default,
    Labels,
    Offset,
}

impl GotoMode {
    pub fn indicator(self) -> char {
        match self {
            GotoMode::Default => 'D',
            GotoMode::Labels => 'L',
            GotoMode::Offset => 'O',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' => Some(GotoMode::Default),
            'l' => Some(GotoMode::Labels),
            'o' => Some(GotoMode::Offset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomKind {
    In,
    Out,
    Original,
    Specific,
}

/// Inclusive zoom bounds in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLimits {
    pub min: u32,
    pub max: u32,
}

impl ZoomLimits {
    pub fn clamp(&self, percent: i64) -> u32 {
        percent.clamp(self.min as i64, self.max as i64) as u32
    }
}

/// View parameters read by the renderer. `scale` stays within the zoom limits
/// at every mutation site; `page` stays below the page count (or 0 without a
/// document).
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    scale: u32,
    limits: ZoomLimits,
    pub rotation: Rotation,
    pub recolor: bool,
    pub adjust: AdjustMode,
    page: usize,
    pub scroll_x: u32,
    pub scroll_y: u32,
}

impl ViewState {
    pub fn new(limits: ZoomLimits, recolor: bool, adjust: AdjustMode) -> Self {
        Self {
            scale: limits.clamp(100),
            limits,
            rotation: Rotation::Deg0,
            recolor,
            adjust,
            page: 0,
            scroll_x: 0,
            scroll_y: 0,
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    pub fn set_scale(&mut self, percent: i64) -> u32 {
        self.scale = self.limits.clamp(percent);
        self.scale
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Moves to `page` if it lies within `page_count`.
    pub fn set_page(&mut self, page: usize, page_count: usize) -> bool {
        if page >= page_count {
            return false;
        }
        self.page = page;
        true
    }

    pub fn scale_factor(&self) -> f64 {
        f64::from(self.scale) / 100.0
    }

    /// Resets everything tied to an open document.
    pub fn reset(&mut self) {
        self.scale = self.limits.clamp(100);
        self.rotation = Rotation::Deg0;
        self.page = 0;
        self.scroll_x = 0;
        self.scroll_y = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ZoomLimits {
        ZoomLimits { min: 10, max: 400 }
    }

    #[test]
    fn scale_is_clamped_on_every_mutation() {
        let mut view = ViewState::new(limits(), false, AdjustMode::None);
        assert_eq!(view.scale(), 100);
        assert_eq!(view.set_scale(1000), 400);
        assert_eq!(view.set_scale(-5), 10);
        assert_eq!(view.set_scale(150), 150);
    }

    #[test]
    fn page_must_lie_within_page_count() {
        let mut view = ViewState::new(limits(), false, AdjustMode::None);
        assert!(view.set_page(4, 5));
        assert!(!view.set_page(5, 5));
        assert_eq!(view.page(), 4);
        assert!(!view.set_page(0, 0));
    }

    #[test]
    fn rotation_cycles_in_quarter_turns() {
        let mut rotation = Rotation::Deg0;
        let mut seen = Vec::new();
        for _ in 0..4 {
            rotation = rotation.rotated();
            seen.push(rotation.degrees());
        }
        assert_eq!(seen, vec![90, 180, 270, 0]);
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn only_normal_modes_have_no_label() {
        assert_eq!(Mode::Insert.label(), "-- INSERT --");
        assert_eq!(Mode::Visual.label(), "-- VISUAL --");
        assert_eq!(Mode::AddMarker.label(), "");
    }
}
