//! Clock face layout: time, weekday, date and the scrolling message line.

use std::time::{SystemTime, UNIX_EPOCH};

use lcd_clock_hw::Framebuffer;

use crate::config::{FontsConfig, ScrollConfig};
use crate::message::MessageBoard;
use crate::rendering::{FontFace, GlyphError, GlyphRasterizer, LineRenderer, Pen};
use crate::theme::{Color, Palette};

/// Weekday labels, Sunday first, with the Chinese numeral for the day.
const WEEKDAYS: [&str; 7] = ["Su日", "Mo一", "Tu二", "We三", "Th四", "Fr五", "Sa六"];

/// Longest fixed line: `HH:MM:SS`, the weekday label and ` MM-DD` all fit.
const FIXED_LINE_CHARS: usize = 8;

/// Baseline positions on the 480x320 panel.
const TIME_ORIGIN: (i32, i32) = (0, 100);
const WEEKDAY_ORIGIN: (i32, i32) = (0, 200);
const DATE_ORIGIN: (i32, i32) = (200, 200);
const MESSAGE_ORIGIN: (i32, i32) = (0, 290);

/// Broken-down local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 0 = Sunday
    pub weekday: u8,
}

impl LocalTime {
    /// Current time in the system's local timezone.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let time_t = secs as libc::time_t;
        let mut tm: libc::tm = unsafe { std::mem::zeroed() };

        // SAFETY: localtime_r is thread-safe and both pointers are valid
        let result = unsafe { libc::localtime_r(&time_t, &mut tm) };

        if result.is_null() {
            // Fall back to UTC; 1970-01-01 was a Thursday.
            let days = secs / 86400;
            return Self {
                hour: ((secs % 86400) / 3600) as u8,
                minute: ((secs % 3600) / 60) as u8,
                second: (secs % 60) as u8,
                month: 1,
                day: 1,
                weekday: ((days + 4) % 7) as u8,
            };
        }

        Self {
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
            second: tm.tm_sec as u8,
            month: (tm.tm_mon + 1) as u8,
            day: tm.tm_mday as u8,
            weekday: tm.tm_wday as u8,
        }
    }

    /// `HH:MM:SS`
    pub fn time_text(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }

    /// ` MM-DD`, the leading space separating it from the weekday.
    pub fn date_text(&self) -> String {
        format!(" {:02}-{:02}", self.month, self.day)
    }

    pub fn weekday_label(&self) -> &'static str {
        WEEKDAYS[usize::from(self.weekday) % WEEKDAYS.len()]
    }
}

/// Faces for the three text sizes on the clock.
pub struct ClockFonts<R> {
    pub time: R,
    pub date: R,
    pub message: R,
}

impl ClockFonts<FontFace> {
    pub fn load(config: &FontsConfig) -> Result<Self, GlyphError> {
        Ok(Self {
            time: FontFace::load(&config.time)?,
            date: FontFace::load(&config.date)?,
            message: FontFace::load(&config.message)?,
        })
    }
}

/// Draws complete clock frames.
pub struct ClockFace<R: GlyphRasterizer = FontFace> {
    fonts: ClockFonts<R>,
    fixed: LineRenderer,
    message: LineRenderer,
    increment: i32,
}

impl<R: GlyphRasterizer> ClockFace<R> {
    pub fn new(fonts: ClockFonts<R>, scroll: &ScrollConfig) -> Self {
        Self {
            fonts,
            fixed: LineRenderer::new(FIXED_LINE_CHARS),
            message: LineRenderer::new(scroll.batch),
            increment: scroll.increment,
        }
    }

    /// Redraws the whole frame and moves the message line on by one step.
    pub fn draw(
        &mut self,
        framebuffer: &mut Framebuffer,
        now: &LocalTime,
        palette: &Palette,
        board: &mut MessageBoard,
    ) {
        let background = palette.background;
        framebuffer.clear(background.red, background.green, background.blue);

        let pen = |(x, y): (i32, i32), foreground: Color| Pen {
            x,
            y,
            foreground,
            background,
        };

        let time = now.time_text();
        self.fixed.draw(
            framebuffer,
            &self.fonts.time,
            pen(TIME_ORIGIN, palette.time),
            time.as_bytes(),
            0,
            0,
        );
        self.fixed.draw(
            framebuffer,
            &self.fonts.date,
            pen(WEEKDAY_ORIGIN, palette.day),
            now.weekday_label().as_bytes(),
            0,
            0,
        );
        let date = now.date_text();
        self.fixed.draw(
            framebuffer,
            &self.fonts.date,
            pen(DATE_ORIGIN, palette.date),
            date.as_bytes(),
            0,
            0,
        );

        let cursor = board.cursor();
        let wrap_ready = self.message.draw(
            framebuffer,
            &self.fonts.message,
            pen(MESSAGE_ORIGIN, palette.message),
            cursor.remaining(board.text()),
            cursor.offset,
            self.increment,
        );
        board.advance(wrap_ready, self.increment);
    }
}
