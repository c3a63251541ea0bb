use std::io::IsTerminal;

use comfy_table::Color as ComfyColor;
use crossterm::style::{Color, Stylize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
  Dark,
  Light,
}

/// Console palette used by the pipeline logger and the catalog table.
#[derive(Debug, Clone, Copy)]
pub struct Colors {
  enabled: bool,
  theme: Theme,
}

pub trait IntoComfyColor {
  fn into_comfy(self) -> ComfyColor;
}

impl IntoComfyColor for Color {
  fn into_comfy(self) -> ComfyColor {
    match self {
      Color::Rgb { r, g, b } => ComfyColor::Rgb { r, g, b },
      Color::AnsiValue(val) => ComfyColor::AnsiValue(val),
      Color::Red | Color::DarkRed => ComfyColor::Red,
      Color::Green | Color::DarkGreen => ComfyColor::Green,
      Color::Yellow | Color::DarkYellow => ComfyColor::Yellow,
      _ => ComfyColor::Reset,
    }
  }
}

impl Colors {
  pub const fn new(enabled: bool, theme: Theme) -> Self {
    Self { enabled, theme }
  }

  /// Palette for the current process. Progress goes to stdout and
  /// diagnostics to stderr, so colours need both to be terminals.
  pub fn detect() -> Self {
    let enabled = std::io::stdout().is_terminal() && std::io::stderr().is_terminal();
    Self::new(enabled, detect_terminal_theme())
  }

  pub const fn plain() -> Self {
    Self::new(false, Theme::Dark)
  }

  pub const fn enabled(&self) -> bool {
    self.enabled
  }

  /// `text` in `color`, or the bare text when colours are disabled.
  pub fn paint(&self, text: impl std::fmt::Display, color: Color) -> String {
    if self.enabled {
      text.to_string().with(color).to_string()
    } else {
      text.to_string()
    }
  }

  const fn pick(&self, dark: Color, light: Color) -> Color {
    if !self.enabled {
      return Color::Reset;
    }

    match self.theme {
      Theme::Dark => dark,
      Theme::Light => light,
    }
  }

  pub const fn timestamp(&self) -> Color {
    self.pick(Color::Rgb { r: 118, g: 166, b: 166 }, Color::Rgb { r: 92, g: 62, b: 38 })
  }

  pub const fn primary(&self) -> Color {
    self.pick(Color::Rgb { r: 191, g: 126, b: 4 }, Color::Rgb { r: 70, g: 42, b: 25 })
  }

  pub const fn accent(&self) -> Color {
    self.pick(Color::Rgb { r: 166, g: 84, b: 55 }, Color::Rgb { r: 211, g: 99, b: 70 })
  }

  pub const fn error(&self) -> Color {
    self.pick(Color::Rgb { r: 224, g: 82, b: 82 }, Color::Rgb { r: 178, g: 34, b: 34 })
  }

  pub const fn success(&self) -> Color {
    self.pick(Color::Rgb { r: 118, g: 166, b: 166 }, Color::Rgb { r: 34, g: 142, b: 90 })
  }

  pub const fn label(&self) -> Color {
    self.pick(Color::Rgb { r: 217, g: 164, b: 4 }, Color::Rgb { r: 176, g: 103, b: 66 })
  }

  pub const fn value(&self) -> Color {
    self.pick(Color::Rgb { r: 242, g: 211, b: 56 }, Color::Rgb { r: 199, g: 146, b: 76 })
  }

  const fn to_clap(color: Color) -> Option<clap::builder::styling::Color> {
    use clap::builder::styling::{Color as ClapColor, RgbColor};

    match color {
      Color::Rgb { r, g, b } => Some(ClapColor::Rgb(RgbColor(r, g, b))),
      _ => None,
    }
  }

  pub const fn clap_styles() -> clap::builder::Styles {
    use clap::builder::styling::{Style, Styles};

    let colors = Self::new(true, Theme::Dark);

    Styles::styled()
      .header(Style::new().bold().underline().fg_color(Self::to_clap(colors.label())))
      .usage(Style::new().bold().fg_color(Self::to_clap(colors.label())))
      .literal(Style::new().fg_color(Self::to_clap(colors.success())))
      .placeholder(Style::new().fg_color(Self::to_clap(colors.primary())))
      .error(Style::new().bold().fg_color(Self::to_clap(colors.error())))
  }
}

fn detect_terminal_theme() -> Theme {
  if let Ok(colorfgbg) = std::env::var("COLORFGBG")
    && let Some(bg) = colorfgbg.split(';').next_back()
    && let Ok(bg_num) = bg.parse::<u8>()
  {
    return if bg_num >= 8 { Theme::Light } else { Theme::Dark };
  }

  Theme::Dark
}
