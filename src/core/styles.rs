//! Style roles for terminal output
//!
//! Each logical style is a variant of `StyleRole` mapped to a `colored::Color`.
//! Colouring is applied only when the `enabled` flag passed to `paint()` is
//! true, so no global colour state is consulted.
//!
//! ```
//! use todoscan::core::styles::StyleRole;
//! assert_eq!(StyleRole::Path.paint("src/main.rs", false), "src/main.rs");
//! assert!(StyleRole::Path.paint("src/main.rs", true).starts_with("\x1b["));
//! ```

use clap::builder::styling::AnsiColor;
use colored::Color;

macro_rules! style {
    ( $( $variant:ident => $color:expr ),+ $(,)? ) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum StyleRole { $( $variant ),+ }

        impl StyleRole {
            pub fn color(self) -> Option<Color> {
                match self { $( StyleRole::$variant => $color ),+ }
            }

            pub fn ansi_code(self) -> Option<&'static str> {
                ansi_code(self.color()?)
            }

            pub fn paint(self, text: &str, enabled: bool) -> String {
                match self.ansi_code() {
                    Some(code) if enabled => format!("\x1b[{}m{}\x1b[0m", code, text),
                    _ => text.to_string(),
                }
            }

            /// prettytable `style_spec` for this role
            pub fn table_spec(self, enabled: bool) -> &'static str {
                if !enabled {
                    return "";
                }
                match self.color() {
                    Some(Color::Red) => "Fr",
                    Some(Color::Green) => "Fg",
                    Some(Color::Yellow) => "Fy",
                    Some(Color::Blue) => "Fb",
                    Some(Color::Magenta) => "Fm",
                    Some(Color::Cyan) => "Fc",
                    Some(Color::BrightBlack) => "FK",
                    Some(Color::BrightRed) => "FR",
                    Some(Color::BrightGreen) => "FG",
                    _ => "",
                }
            }
        }
    }
}

style! {
    Header  => Some(Color::Yellow),
    Path    => Some(Color::Cyan),
    Line    => Some(Color::BrightBlack),
    Marker  => Some(Color::Magenta),
    Context => Some(Color::BrightBlack),
    Success => Some(Color::Green),
    Failure => Some(Color::BrightRed),
    Literal => Some(Color::Cyan),
    Value   => None,
}

fn ansi_code(color: Color) -> Option<&'static str> {
    use Color::*;
    Some(match color {
        Red => "31",
        Green => "32",
        Yellow => "33",
        Blue => "34",
        Magenta => "35",
        Cyan => "36",
        BrightBlack => "90",
        BrightRed => "91",
        BrightGreen => "92",
        _ => return None,
    })
}

fn clap_color(color: Color) -> Option<AnsiColor> {
    use clap::builder::styling::AnsiColor as A;
    use Color::*;
    Some(match color {
        Red => A::Red,
        Green => A::Green,
        Yellow => A::Yellow,
        Blue => A::Blue,
        Magenta => A::Magenta,
        Cyan => A::Cyan,
        BrightBlack => A::BrightBlack,
        BrightRed => A::BrightRed,
        BrightGreen => A::BrightGreen,
        _ => return None,
    })
}

/// clap help styles built from the same roles
pub fn clap_styles(enabled: bool) -> clap::builder::Styles {
    use clap::builder::styling::{Color as ClapColor, Style};
    if !enabled {
        return clap::builder::Styles::plain();
    }

    let style = |role: StyleRole, bold: bool| {
        let mut s = Style::new();
        if let Some(color) = role.color().and_then(clap_color) {
            s = s.fg_color(Some(ClapColor::Ansi(color)));
        }
        if bold {
            s = s.bold();
        }
        s
    };

    clap::builder::Styles::styled()
        .header(style(StyleRole::Header, true))
        .usage(style(StyleRole::Header, true))
        .literal(style(StyleRole::Literal, false))
        .placeholder(style(StyleRole::Success, false))
        .error(style(StyleRole::Failure, true))
}
