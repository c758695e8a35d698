use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::state::Sender;

// ---------------------------------------------------------------------------
// Chart colours
// ---------------------------------------------------------------------------

/// `n` distinct bar colours with evenly spaced hues, starting from blue.
pub fn bar_colors(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = 210.0 + (i as f32 / n as f32) * 360.0;
            let rgb: Srgb = Hsl::new(hue, 0.65, 0.5).into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Chat colours
// ---------------------------------------------------------------------------

pub fn sender_color(sender: Sender) -> Color32 {
    let hex: u32 = match sender {
        Sender::User => 0x1a73e8,
        Sender::Agent => 0x0d652d,
        Sender::Error => 0xd93025,
        Sender::System => 0x5f6368,
    };
    let rgb = Srgb::<u8>::from(hex);
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}
