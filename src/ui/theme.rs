use fltk::{app, enums::Color};

// Dark theme color palette
pub const BG_DARK: u32        = 0x1e1e2e;  // plot background
pub const BG_PANEL: u32       = 0x2a2a3a;  // sidebar / status bar
pub const BG_WIDGET: u32      = 0x363646;  // slider troughs, buttons
pub const TEXT_PRIMARY: u32   = 0xcdd6f4;  // main text, plot title
pub const TEXT_SECONDARY: u32 = 0xa6adc8;  // value readouts, tick labels
pub const TEXT_DISABLED: u32  = 0x6c7086;
pub const ACCENT_BLUE: u32    = 0x89b4fa;  // slider knobs
pub const ACCENT_GREEN: u32   = 0xa6e3a1;  // cycle ok
pub const ACCENT_RED: u32     = 0xf38ba8;  // engine errors
pub const ACCENT_MAUVE: u32   = 0xcba6f7;  // section headers
pub const BORDER: u32         = 0x45475a;  // plot frame

fn rgb(hex: u32) -> (u8, u8, u8) {
    (((hex >> 16) & 0xFF) as u8, ((hex >> 8) & 0xFF) as u8, (hex & 0xFF) as u8)
}

pub fn apply_dark_theme() {
    let (r, g, b) = rgb(BG_PANEL);
    app::set_background_color(r, g, b);
    let (r, g, b) = rgb(BG_WIDGET);
    app::set_background2_color(r, g, b);
    let (r, g, b) = rgb(TEXT_PRIMARY);
    app::set_foreground_color(r, g, b);
    let (r, g, b) = rgb(ACCENT_BLUE);
    app::set_selection_color(r, g, b);
    let (r, g, b) = rgb(TEXT_DISABLED);
    app::set_inactive_color(r, g, b);

    app::set_scheme(app::Scheme::Gtk);

    // Tooltips follow the palette too
    fltk::misc::Tooltip::set_color(color(BG_WIDGET));
    fltk::misc::Tooltip::set_text_color(color(TEXT_PRIMARY));
    fltk::misc::Tooltip::set_font_size(11);
    fltk::misc::Tooltip::set_delay(0.5);
}

pub fn set_tooltips_enabled(enabled: bool) {
    if enabled {
        fltk::misc::Tooltip::enable(true);
    } else {
        fltk::misc::Tooltip::disable();
    }
}

pub fn color(hex: u32) -> Color {
    Color::from_hex(hex)
}

pub fn section_header_color() -> Color {
    Color::from_hex(ACCENT_MAUVE)
}

pub fn accent_color() -> Color {
    Color::from_hex(ACCENT_BLUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_split() {
        assert_eq!(rgb(0xb22222), (0xb2, 0x22, 0x22));
        assert_eq!(rgb(BG_DARK), (0x1e, 0x1e, 0x2e));
    }
}
