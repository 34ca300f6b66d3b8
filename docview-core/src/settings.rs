use crate::config::{Config, Rgb};
use crate::error::CommandError;
use crate::view::{GotoMode, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Int,
    Str,
    Char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Recolor,
    Password,
    ZoomStep,
    ScrollStep,
    RecolorDarkcolor,
    RecolorLightcolor,
    SearchHighlight,
    GotoDefault,
    Statusbar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingSpec {
    pub name: &'static str,
    pub key: SettingKey,
    pub kind: SettingKind,
    pub affects_render: bool,
    pub description: &'static str,
}

const fn spec(
    name: &'static str,
    key: SettingKey,
    kind: SettingKind,
    affects_render: bool,
    description: &'static str,
) -> SettingSpec {
    SettingSpec {
        name,
        key,
        kind,
        affects_render,
        description,
    }
}

pub const SETTINGS: &[SettingSpec] = &[
    spec("goto_default", SettingKey::GotoDefault, SettingKind::Char, false, "Default goto mode (d, l or o)"),
    spec("password", SettingKey::Password, SettingKind::Str, false, "Password for encrypted documents"),
    spec("recolor", SettingKey::Recolor, SettingKind::Bool, true, "Invert the image"),
    spec("recolor_darkcolor", SettingKey::RecolorDarkcolor, SettingKind::Str, true, "Recoloring (dark color)"),
    spec("recolor_lightcolor", SettingKey::RecolorLightcolor, SettingKind::Str, true, "Recoloring (light color)"),
    spec("scroll_step", SettingKey::ScrollStep, SettingKind::Int, false, "Scroll step"),
    spec("search_highlight", SettingKey::SearchHighlight, SettingKind::Str, true, "Highlighted results"),
    spec("statusbar", SettingKey::Statusbar, SettingKind::Bool, false, "Show the statusbar"),
    spec("zoom_step", SettingKey::ZoomStep, SettingKind::Int, false, "Zoom step"),
];

pub fn find_setting(name: &str) -> Option<&'static SettingSpec> {
    SETTINGS.iter().find(|s| s.name == name)
}

/// Runtime values adjustable with `:set`. The recolor flag lives on the
/// [`ViewState`] because the renderer reads it from there.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub password: String,
    pub zoom_step: u32,
    pub scroll_step: u32,
    pub recolor_darkcolor: Rgb,
    pub recolor_lightcolor: Rgb,
    pub search_highlight: Rgb,
    pub highlight_alpha: f32,
    pub goto_default: GotoMode,
    pub statusbar: bool,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            password: config.password.clone(),
            zoom_step: config.zoom_step,
            scroll_step: config.scroll_step,
            recolor_darkcolor: config.recolor_darkcolor,
            recolor_lightcolor: config.recolor_lightcolor,
            search_highlight: config.search_highlight,
            highlight_alpha: config.highlight_alpha,
            goto_default: config.goto_mode,
            statusbar: true,
        }
    }

    /// Current value rendered for completion descriptions.
    pub fn display(&self, key: SettingKey, view: &ViewState) -> String {
        match key {
            SettingKey::Recolor => view.recolor.to_string(),
            SettingKey::Password => "*".repeat(self.password.chars().count()),
            SettingKey::ZoomStep => self.zoom_step.to_string(),
            SettingKey::ScrollStep => self.scroll_step.to_string(),
            SettingKey::RecolorDarkcolor => self.recolor_darkcolor.to_string(),
            SettingKey::RecolorLightcolor => self.recolor_lightcolor.to_string(),
            SettingKey::SearchHighlight => self.search_highlight.to_string(),
            SettingKey::GotoDefault => self.goto_default.indicator().to_string(),
            SettingKey::Statusbar => self.statusbar.to_string(),
        }
    }

    /// Applies `:set <name> [value]`. Booleans toggle when no value is given;
    /// every other kind takes exactly one value.
    pub fn apply(
        &mut self,
        view: &mut ViewState,
        args: &[&str],
    ) -> Result<&'static SettingSpec, CommandError> {
        let (name, value) = match args {
            [name] => (*name, None),
            [name, value] => (*name, Some(*value)),
            [] => return Err(CommandError::MissingArgument("No option specified")),
            _ => {
                return Err(CommandError::InvalidArgument {
                    value: args.join(" "),
                    reason: "expected an option and at most one value",
                })
            }
        };
        let spec = find_setting(name).ok_or_else(|| CommandError::UnknownSetting(name.to_string()))?;

        let required = || value.ok_or(CommandError::MissingArgument("No value specified"));
        match spec.key {
            SettingKey::Recolor => view.recolor = toggle(view.recolor, value),
            SettingKey::Statusbar => self.statusbar = toggle(self.statusbar, value),
            SettingKey::Password => self.password = required()?.to_string(),
            SettingKey::ZoomStep => self.zoom_step = parse_step(required()?)?,
            SettingKey::ScrollStep => self.scroll_step = parse_step(required()?)?,
            SettingKey::RecolorDarkcolor => self.recolor_darkcolor = parse_color(required()?)?,
            SettingKey::RecolorLightcolor => self.recolor_lightcolor = parse_color(required()?)?,
            SettingKey::SearchHighlight => self.search_highlight = parse_color(required()?)?,
            SettingKey::GotoDefault => {
                let value = required()?;
                self.goto_default = value
                    .chars()
                    .next()
                    .and_then(GotoMode::from_char)
                    .ok_or_else(|| CommandError::InvalidArgument {
                        value: value.to_string(),
                        reason: "expected d, l or o",
                    })?
            }
        }
        Ok(spec)
    }
}

fn toggle(current: bool, value: Option<&str>) -> bool {
    match value {
        None => !current,
        Some(v) => !(v == "false" || v == "0"),
    }
}

fn parse_step(value: &str) -> Result<u32, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        value: value.to_string(),
        reason: "expected a non-negative integer",
    })
}

fn parse_color(value: &str) -> Result<Rgb, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        value: value.to_string(),
        reason: "expected a color of the form #rrggbb",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{AdjustMode, ZoomLimits};

    fn state() -> (Settings, ViewState) {
        let config = Config::default();
        let view = ViewState::new(
            ZoomLimits {
                min: config.zoom_min,
                max: config.zoom_max,
            },
            false,
            AdjustMode::None,
        );
        (Settings::from_config(&config), view)
    }

    #[test]
    fn boolean_without_value_toggles() {
        let (mut settings, mut view) = state();
        let spec = settings.apply(&mut view, &["recolor"]).unwrap();
        assert!(spec.affects_render);
        assert!(view.recolor);
        settings.apply(&mut view, &["recolor"]).unwrap();
        assert!(!view.recolor);
    }

    #[test]
    fn boolean_values_follow_false_or_zero() {
        let (mut settings, mut view) = state();
        settings.apply(&mut view, &["statusbar", "0"]).unwrap();
        assert!(!settings.statusbar);
        settings.apply(&mut view, &["statusbar", "yes"]).unwrap();
        assert!(settings.statusbar);
        settings.apply(&mut view, &["statusbar", "false"]).unwrap();
        assert!(!settings.statusbar);
    }

    #[test]
    fn typed_settings_need_exactly_one_value() {
        let (mut settings, mut view) = state();
        assert!(matches!(
            settings.apply(&mut view, &["zoom_step"]),
            Err(CommandError::MissingArgument(_))
        ));
        assert!(matches!(
            settings.apply(&mut view, &["zoom_step", "1", "2"]),
            Err(CommandError::InvalidArgument { .. })
        ));
        settings.apply(&mut view, &["zoom_step", "25"]).unwrap();
        assert_eq!(settings.zoom_step, 25);
        settings.apply(&mut view, &["goto_default", "offset"]).unwrap();
        assert_eq!(settings.goto_default, GotoMode::Offset);
    }

    #[test]
    fn unknown_names_and_bad_values_are_rejected() {
        let (mut settings, mut view) = state();
        assert!(matches!(
            settings.apply(&mut view, &["nope", "1"]),
            Err(CommandError::UnknownSetting(name)) if name == "nope"
        ));
        assert!(settings
            .apply(&mut view, &["recolor_darkcolor", "black"])
            .is_err());
        assert!(settings.apply(&mut view, &[]).is_err());
    }

    #[test]
    fn password_is_masked_in_display() {
        let (mut settings, mut view) = state();
        settings.apply(&mut view, &["password", "secret"]).unwrap();
        assert_eq!(settings.display(SettingKey::Password, &view), "******");
    }
}
