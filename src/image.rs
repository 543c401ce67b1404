//! Picture output for a filled grid: blocks are black, fillable cells are white squares inside a
//! thin black border, and each letter sits centred in its cell. The grid is laid out as SVG and
//! rasterized with resvg when a PNG is wanted.

use std::fmt::Write;
use std::fs;
use std::path::Path;

use tiny_skia::{Pixmap, Transform};

use crate::grid::{letter_grid, Choice, Crossword};
use crate::word_list::WordList;

/// Side of one cell, in pixels.
pub const CELL_SIZE: u32 = 100;

/// Black margin on every side of a fillable cell.
pub const CELL_BORDER: u32 = 2;

const FONT_SIZE: u32 = 80;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to lay out grid image: {0}")]
    Layout(#[from] std::fmt::Error),

    #[error("failed to parse generated SVG: {0}")]
    Svg(String),

    #[error("failed to allocate {width}x{height} image")]
    Allocation { width: u32, height: u32 },

    #[error("failed to encode PNG: {0}")]
    Encode(String),

    #[error("failed to write image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The file formats `save_image` knows how to write, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    /// The picture format for a path, or `None` if the extension isn't one we draw.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<ImageFormat> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(ImageFormat::Png),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }
}

fn escape_xml(letter: char) -> String {
    match letter {
        '&' => "&amp;".to_string(),
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        '"' => "&quot;".to_string(),
        '\'' => "&apos;".to_string(),
        _ => letter.to_string(),
    }
}

/// Lay the filled grid out as an SVG document.
pub fn render_svg(crossword: &Crossword, words: &WordList, choices: &[Choice]) -> Result<String, ImageError> {
    let letters = letter_grid(crossword, words, choices);
    let width = crossword.width as u32 * CELL_SIZE;
    let height = crossword.height as u32 * CELL_SIZE;
    let interior = CELL_SIZE - 2 * CELL_BORDER;

    let mut svg = String::new();
    write!(
        svg,
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="Open Sans, DejaVu Sans, sans-serif">
  <rect width="100%" height="100%" fill="#000000" />
"##,
    )?;

    for (row, line) in letters.iter().enumerate() {
        for (col, letter) in line.iter().enumerate() {
            if !crossword.is_fillable(row, col) {
                continue;
            }

            let x = col as u32 * CELL_SIZE;
            let y = row as u32 * CELL_SIZE;
            writeln!(
                svg,
                r##"  <rect x="{}" y="{}" width="{interior}" height="{interior}" fill="#ffffff" />"##,
                x + CELL_BORDER,
                y + CELL_BORDER,
            )?;

            if let Some(letter) = letter {
                writeln!(
                    svg,
                    r##"  <text x="{}" y="{}" fill="#000000" font-size="{FONT_SIZE}" text-anchor="middle" dominant-baseline="central">{}</text>"##,
                    x + CELL_SIZE / 2,
                    y + CELL_SIZE / 2,
                    escape_xml(*letter),
                )?;
            }
        }
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Rasterize the filled grid. Letters are drawn with whatever system font resolves first; if none
/// is installed the cells are still drawn, just without letters.
pub fn render_image(crossword: &Crossword, words: &WordList, choices: &[Choice]) -> Result<Pixmap, ImageError> {
    let svg = render_svg(crossword, words, choices)?;

    let mut options = resvg::usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = resvg::usvg::Tree::from_str(&svg, &options).map_err(|err| ImageError::Svg(err.to_string()))?;

    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap = Pixmap::new(width, height).ok_or(ImageError::Allocation { width, height })?;

    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

    Ok(pixmap)
}

/// Write the filled grid to `path` in the given picture format.
pub fn save_image<P: AsRef<Path>>(
    crossword: &Crossword,
    words: &WordList,
    choices: &[Choice],
    path: P,
    format: ImageFormat,
) -> Result<(), ImageError> {
    let path = path.as_ref();

    let bytes = match format {
        ImageFormat::Svg => render_svg(crossword, words, choices)?.into_bytes(),
        ImageFormat::Png => render_image(crossword, words, choices)?
            .encode_png()
            .map_err(|err| ImageError::Encode(err.to_string()))?,
    };

    fs::write(path, bytes).map_err(|source| ImageError::Io {
        path: path.display().to_string(),
        source,
    })?;

    log::debug!("Saved {:?} image to {}", format, path.display());
    Ok(())
}
