use image::Rgba;
use ratatui::style::Color;

pub struct Theme {
    pub canvas: Color,   // White raster background
    pub grid: Color,     // Light grey dashed grid
    pub outline: Color,  // Block outline on the raster
    pub existing: Color, // Light grey, persisting blocks
    pub new: Color,      // Red, blocks new in this frame
    pub comment: Color,
    pub border: Color,
    pub title: Color,
    pub existing_cell: Color, // Terminal glyph colors
    pub new_cell: Color,
}

pub const DEFAULT_THEME: Theme = Theme {
    canvas: Color::Rgb(255, 255, 255),
    grid: Color::Rgb(200, 200, 200),
    outline: Color::Rgb(0, 0, 0),
    existing: Color::Rgb(217, 217, 217),
    new: Color::Rgb(230, 25, 25),
    comment: Color::Rgb(108, 112, 134),
    border: Color::Rgb(108, 112, 134),         // Grey border
    title: Color::Rgb(249, 226, 175),          // Yellow title
    existing_cell: Color::Rgb(166, 173, 200),  // Muted lavender
    new_cell: Color::Rgb(243, 139, 168),       // Red/pink
};

/// Raster pixel for a theme color. Only RGB colors carry exact values;
/// named colors map to their usual terminal approximations.
pub fn to_rgba(color: Color) -> Rgba<u8> {
    let [r, g, b] = match color {
        Color::Rgb(r, g, b) => [r, g, b],
        Color::Black => [0, 0, 0],
        Color::White => [255, 255, 255],
        Color::Red | Color::LightRed => [255, 0, 0],
        Color::Gray => [192, 192, 192],
        Color::DarkGray => [128, 128, 128],
        _ => [128, 128, 128],
    };
    Rgba([r, g, b, 255])
}
