use ratatui::style::Color;

/// Fixed palette for the dashboard. Three themes cycle in order; the
/// config file picks the starting one by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub accent_bg: Color,
    pub accent_fg: Color,
    pub border: Color,
    pub title: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub gauge_filled: Color,
    pub gauge_unfilled: Color,
    pub sparkline: Color,
    pub ok: Color,
    pub warn: Color,
    pub err: Color,
    pub statusbar_bg: Color,
    pub surface_bg: Color,
    pub pill_key_fg: Color,
    pub pill_key_bg: Color,
    pub pill_desc_fg: Color,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light" => Self::light(),
            "mono" | "monochrome" => Self::mono(),
            _ => Self::dark(),
        }
    }

    pub fn next(&self) -> Self {
        match self.name {
            "dark" => Self::light(),
            "light" => Self::mono(),
            _ => Self::dark(),
        }
    }

    fn dark() -> Self {
        Theme {
            name: "dark",
            accent_bg: Color::Rgb(137, 180, 250),
            accent_fg: Color::Rgb(17, 17, 27),
            border: Color::Rgb(88, 91, 112),
            title: Color::Rgb(203, 166, 247),
            text_primary: Color::Rgb(205, 214, 244),
            text_secondary: Color::Rgb(147, 153, 178),
            gauge_filled: Color::Rgb(137, 180, 250),
            gauge_unfilled: Color::Rgb(49, 50, 68),
            sparkline: Color::Rgb(148, 226, 213),
            ok: Color::Rgb(166, 227, 161),
            warn: Color::Rgb(249, 226, 175),
            err: Color::Rgb(243, 139, 168),
            statusbar_bg: Color::Rgb(24, 24, 37),
            surface_bg: Color::Rgb(30, 30, 46),
            pill_key_fg: Color::Rgb(17, 17, 27),
            pill_key_bg: Color::Rgb(137, 180, 250),
            pill_desc_fg: Color::Rgb(166, 173, 200),
        }
    }

    fn light() -> Self {
        Theme {
            name: "light",
            accent_bg: Color::Rgb(30, 102, 245),
            accent_fg: Color::Rgb(239, 241, 245),
            border: Color::Rgb(156, 160, 176),
            title: Color::Rgb(136, 57, 239),
            text_primary: Color::Rgb(76, 79, 105),
            text_secondary: Color::Rgb(108, 111, 133),
            gauge_filled: Color::Rgb(30, 102, 245),
            gauge_unfilled: Color::Rgb(204, 208, 218),
            sparkline: Color::Rgb(23, 146, 153),
            ok: Color::Rgb(64, 160, 43),
            warn: Color::Rgb(223, 142, 29),
            err: Color::Rgb(210, 15, 57),
            statusbar_bg: Color::Rgb(230, 233, 239),
            surface_bg: Color::Rgb(239, 241, 245),
            pill_key_fg: Color::Rgb(239, 241, 245),
            pill_key_bg: Color::Rgb(30, 102, 245),
            pill_desc_fg: Color::Rgb(92, 95, 119),
        }
    }

    fn mono() -> Self {
        Theme {
            name: "mono",
            accent_bg: Color::Gray,
            accent_fg: Color::Black,
            border: Color::DarkGray,
            title: Color::White,
            text_primary: Color::Gray,
            text_secondary: Color::DarkGray,
            gauge_filled: Color::Gray,
            gauge_unfilled: Color::Black,
            sparkline: Color::Gray,
            ok: Color::White,
            warn: Color::Gray,
            err: Color::White,
            statusbar_bg: Color::Black,
            surface_bg: Color::Black,
            pill_key_fg: Color::Black,
            pill_key_bg: Color::Gray,
            pill_desc_fg: Color::Gray,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_dark() {
        assert_eq!(Theme::from_name("dark").name, "dark");
        assert_eq!(Theme::from_name("LIGHT").name, "light");
        assert_eq!(Theme::from_name("solarized").name, "dark");
    }

    #[test]
    fn cycle_visits_every_theme_and_wraps() {
        let first = Theme::from_name("dark");
        let second = first.next();
        let third = second.next();
        assert_eq!(second.name, "light");
        assert_eq!(third.name, "mono");
        assert_eq!(third.next().name, first.name);
    }
}
