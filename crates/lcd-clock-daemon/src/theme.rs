//! Colour themes that follow the time of day.

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// X11 colour names used by the themes.
pub mod x11 {
    use super::Color;

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREY5: Color = Color::rgb(13, 13, 13);
    pub const GREY10: Color = Color::rgb(26, 26, 26);
    pub const GREY15: Color = Color::rgb(38, 38, 38);
    pub const GREY20: Color = Color::rgb(51, 51, 51);

    pub const STEEL_BLUE: Color = Color::rgb(70, 130, 180);
    pub const DARK_BLUE: Color = Color::rgb(0, 0, 139);
    pub const MIDNIGHT_BLUE: Color = Color::rgb(25, 25, 112);
    pub const SLATE_BLUE: Color = Color::rgb(106, 90, 205);

    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GOLD: Color = Color::rgb(255, 215, 0);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const GOLD2: Color = Color::rgb(238, 201, 0);

    pub const PINK: Color = Color::rgb(255, 192, 203);
    pub const HOT_PINK: Color = Color::rgb(255, 105, 180);
    pub const DEEP_PINK: Color = Color::rgb(255, 20, 147);
    pub const DEEP_PINK2: Color = Color::rgb(238, 18, 137);

    pub const LIGHT_CYAN: Color = Color::rgb(224, 255, 255);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const SKY_BLUE: Color = Color::rgb(135, 206, 235);
    pub const LIGHT_BLUE: Color = Color::rgb(173, 216, 230);
}

/// Colours for each element of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub time: Color,
    pub day: Color,
    pub date: Color,
    pub message: Color,
    pub background: Color,
}

/// Before 06:00.
pub const EARLY: Palette = Palette {
    time: x11::STEEL_BLUE,
    day: x11::DARK_BLUE,
    date: x11::MIDNIGHT_BLUE,
    message: x11::SLATE_BLUE,
    background: x11::GREY5,
};

/// 06:00 to 12:00.
pub const MORNING: Palette = Palette {
    time: x11::YELLOW,
    day: x11::GOLD,
    date: x11::ORANGE,
    message: x11::GOLD2,
    background: x11::BLACK,
};

/// 12:00 to 18:00.
pub const AFTERNOON: Palette = Palette {
    time: x11::PINK,
    day: x11::HOT_PINK,
    date: x11::DEEP_PINK,
    message: x11::DEEP_PINK2,
    background: x11::BLACK,
};

/// From 18:00.
pub const EVENING: Palette = Palette {
    time: x11::LIGHT_CYAN,
    day: x11::CYAN,
    date: x11::SKY_BLUE,
    message: x11::LIGHT_BLUE,
    background: x11::GREY10,
};

/// Clock not synchronised: the time may be wrong, so make it obvious.
pub const UNSYNC: Palette = Palette {
    time: x11::BLACK,
    day: x11::GREY10,
    date: x11::GREY20,
    message: x11::GREY15,
    background: x11::RED,
};

impl Palette {
    /// Picks the palette for a local hour (0-23).
    pub fn select(hour: u8, synchronized: bool) -> &'static Palette {
        match hour {
            _ if !synchronized => &UNSYNC,
            0..=5 => &EARLY,
            6..=11 => &MORNING,
            12..=17 => &AFTERNOON,
            _ => &EVENING,
        }
    }
}
