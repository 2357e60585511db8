use std::path::PathBuf;

use crate::classify::ClassifiedRule;
use crate::error::{Error, Result};
use crate::grid::{Lattice, Rule};
use crate::simulation::Simulation;

/// Configuration for GIF animation export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Lattice side length (odd).
    pub size: usize,
    /// Number of generations to animate.
    pub generations: u32,
    /// Output directory for generated GIF files.
    pub output_dir: PathBuf,
    /// Delay between frames in hundredths of a second (e.g. 10 = 100ms).
    pub frame_delay: u16,
    /// Pixel scale: each cell is rendered as scale×scale pixels.
    pub cell_scale: u32,
    /// Height in pixels of the text overlay area at the top.
    pub overlay_height: u32,
    /// Render every Nth generation to keep file size reasonable.
    pub frame_step: u32,
    /// Size in pixels (square) of the population trace in the overlay.
    pub plot_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            size: 51,
            generations: 100,
            output_dir: PathBuf::from("output"),
            frame_delay: 8,
            cell_scale: 4,
            overlay_height: 60,
            frame_step: 1,
            plot_size: 50,
        }
    }
}

/// Export result containing the path and summary statistics.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub path: PathBuf,
    pub label: String,
    pub total_frames: u32,
    pub final_population: u64,
}

const LIVE: [u8; 3] = [0x40, 0xFF, 0x40];
const SHADOW: [u8; 3] = [0x1E, 0x50, 0x28];
const DEAD: [u8; 3] = [0x0A, 0x0A, 0x2E];

/// Export a GIF animation of a rule grown from the single seed.
///
/// Each frame shows the central z-slice in bright green over a dim
/// projection of every live cell along z. The overlay carries the rule
/// label, its class code when known, a generation/population counter and a
/// running population trace.
pub fn export_gif(
    rule: &Rule,
    config: &ExportConfig,
    classified: Option<&ClassifiedRule>,
) -> Result<ExportResult> {
    let mut sim = Simulation::new(Lattice::seeded(config.size)?, *rule);
    let label = rule.label();
    let (img_width, img_height) = image_dimensions(config)?;
    let (gif_width, gif_height) = (img_width as u16, img_height as u16);

    std::fs::create_dir_all(&config.output_dir)?;
    let path = config.output_dir.join(format!("rule_{}.gif", rule.number()));

    let file = std::fs::File::create(&path)?;
    let mut encoder = gif::Encoder::new(file, gif_width, gif_height, &[])?;
    encoder.set_repeat(gif::Repeat::Infinite)?;

    let title = match classified {
        Some(c) => format!("{label} [{}]", c.code()),
        None => label.clone(),
    };

    let frame_step = config.frame_step.max(1);
    let mut trace: Vec<u64> = Vec::with_capacity(config.generations as usize + 1);
    let mut frame_count = 0u32;

    let final_pop = loop {
        let generation = sim.generation;
        let lattice = sim.lattice();
        let pop = lattice.population();
        trace.push(pop);

        if generation % frame_step == 0 {
            let mut pixels = vec![0u8; img_width as usize * img_height as usize * 4];

            fill_rect(&mut pixels, img_width, 0, 0, img_width, config.overlay_height, [0x1A; 3]);
            render_text(&mut pixels, img_width, 2, 2, &title, [0xFF; 3]);
            render_text(
                &mut pixels,
                img_width,
                2,
                11,
                &format!("GEN:{generation} POP:{pop}"),
                [0xCC; 3],
            );
            if config.overlay_height >= config.plot_size + 4 && img_width > config.plot_size + 4 {
                render_mini_trace(
                    &mut pixels,
                    img_width,
                    img_width - config.plot_size - 2,
                    2,
                    config.plot_size,
                    &trace,
                    config.generations as usize + 1,
                );
            }

            render_slice(&mut pixels, img_width, config, lattice);

            // speed=1 gives best LZW compression quality.
            let mut frame = gif::Frame::from_rgba_speed(gif_width, gif_height, &mut pixels, 1);
            frame.delay = config.frame_delay;
            encoder.write_frame(&frame)?;
            frame_count += 1;
        }

        if pop == 0 || generation >= config.generations {
            break pop;
        }
        sim.step();
    };

    log::info!("Wrote {} for {} ({frame_count} frames)", path.display(), sim.rule());
    Ok(ExportResult {
        path,
        label,
        total_frames: frame_count,
        final_population: final_pop,
    })
}

/// Pixel size of one frame; GIF dimensions are limited to 16 bits.
fn image_dimensions(config: &ExportConfig) -> Result<(u32, u32)> {
    let width = config.size as u64 * u64::from(config.cell_scale);
    let height = width + u64::from(config.overlay_height);
    if width == 0 || width > u64::from(u16::MAX) || height > u64::from(u16::MAX) {
        return Err(Error::ImageSize { width, height });
    }
    Ok((width as u32, height as u32))
}

/// Export animations for several rules; one failure does not stop the rest.
pub fn export_multiple(
    rules: &[(Rule, Option<ClassifiedRule>)],
    config: &ExportConfig,
) -> Vec<Result<ExportResult>> {
    rules
        .iter()
        .map(|(rule, classified)| export_gif(rule, config, classified.as_ref()))
        .collect()
}

/// Draw the central z-slice below the overlay.
fn render_slice(pixels: &mut [u8], img_width: u32, config: &ExportConfig, lattice: &Lattice) {
    let n = lattice.size();
    let slice = lattice.slice_z(lattice.center());
    let scale = config.cell_scale;

    for gy in 0..n {
        for gx in 0..n {
            let color = if slice[gy * n + gx] == 1 {
                LIVE
            } else if (0..n as i64).any(|z| lattice.get(gx as i64, gy as i64, z)) {
                SHADOW
            } else {
                DEAD
            };
            fill_rect(
                pixels,
                img_width,
                gx as u32 * scale,
                gy as u32 * scale + config.overlay_height,
                scale,
                scale,
                color,
            );
        }
    }
}

/// Render the population trace so far, scaled to the full run length on x
/// and to the running maximum on y.
fn render_mini_trace(
    pixels: &mut [u8],
    img_width: u32,
    origin_x: u32,
    origin_y: u32,
    plot_size: u32,
    trace: &[u64],
    span: usize,
) {
    fill_rect(pixels, img_width, origin_x, origin_y, plot_size, plot_size, [0x10, 0x10, 0x18]);

    // Border.
    for i in 0..plot_size {
        set_pixel(pixels, img_width, origin_x + i, origin_y, [0x40; 3]);
        set_pixel(pixels, img_width, origin_x + i, origin_y + plot_size - 1, [0x40; 3]);
        set_pixel(pixels, img_width, origin_x, origin_y + i, [0x40; 3]);
        set_pixel(pixels, img_width, origin_x + plot_size - 1, origin_y + i, [0x40; 3]);
    }

    let max = trace.iter().copied().max().unwrap_or(0).max(1) as f64;
    let margin = 2u32;
    let inner = plot_size.saturating_sub(margin * 2).max(1);
    let span = span.max(2) - 1;

    for (i, &pop) in trace.iter().enumerate() {
        let nx = (i as f64 / span as f64 * inner as f64) as u32;
        let ny = ((1.0 - pop as f64 / max) * inner as f64) as u32;
        let px = origin_x + margin + nx.min(inner - 1);
        let py = origin_y + margin + ny.min(inner - 1);
        let color = if i + 1 == trace.len() { [0xFF, 0xFF, 0x00] } else { [0x60, 0x60, 0x80] };
        set_pixel(pixels, img_width, px, py, color);
    }
}

/// Fill an axis-aligned rectangle, clipped to the buffer.
fn fill_rect(pixels: &mut [u8], img_width: u32, x: u32, y: u32, w: u32, h: u32, rgb: [u8; 3]) {
    for py in y..y + h {
        for px in x..x + w {
            set_pixel(pixels, img_width, px, py, rgb);
        }
    }
}

/// Set a single pixel in the RGBA buffer (with bounds checking).
fn set_pixel(pixels: &mut [u8], img_width: u32, x: u32, y: u32, rgb: [u8; 3]) {
    let row = img_width as usize * 4;
    let img_height = pixels.len() / row;
    if x < img_width && (y as usize) < img_height {
        let idx = y as usize * row + x as usize * 4;
        pixels[idx..idx + 3].copy_from_slice(&rgb);
        pixels[idx + 3] = 0xFF;
    }
}

// ── Minimal 5×7 bitmap font ─────────────────────────────────────────────────

/// Render a string using the built-in 5×7 bitmap font.
fn render_text(pixels: &mut [u8], img_width: u32, start_x: u32, start_y: u32, text: &str, rgb: [u8; 3]) {
    let mut cursor_x = start_x;
    for ch in text.chars() {
        for (row, &bits) in char_glyph(ch).iter().enumerate() {
            for col in 0..5u32 {
                if (bits >> (4 - col)) & 1 == 1 {
                    set_pixel(pixels, img_width, cursor_x + col, start_y + row as u32, rgb);
                }
            }
        }
        cursor_x += 6; // 5 pixels wide + 1 pixel gap
    }
}

/// Return the 5×7 bitmap for a character. Each byte represents one row,
/// with the top 5 bits encoding pixel columns (MSB = leftmost). Only the
/// characters used by the overlay are defined.
fn char_glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b01110, 0b10000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00001, 0b01110],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        ':' => [0b00000, 0b00100, 0b00100, 0b00000, 0b00100, 0b00100, 0b00000],
        '[' => [0b01110, 0b01000, 0b01000, 0b01000, 0b01000, 0b01000, 0b01110],
        ']' => [0b01110, 0b00010, 0b00010, 0b00010, 0b00010, 0b00010, 0b01110],
        ' ' => [0; 7],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111], // box
    }
}
