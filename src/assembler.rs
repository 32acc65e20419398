use image::{imageops, Rgb, RgbImage};
use tracing::{info, instrument, warn};

/// Fill colour for tiles that could not be decoded.
pub const PLACEHOLDER: Rgb<u8> = Rgb([128, 128, 128]);

fn decode_tile(index: usize, bytes: &[u8]) -> Option<RgbImage> {
    match image::load_from_memory(bytes) {
        Ok(tile) => Some(tile.to_rgb8()),
        Err(err) => {
            let mime_type = infer::get(bytes).map(|kind| kind.mime_type());
            warn!(index, ?mime_type, error = %err, "failed to decode tile, leaving placeholder");
            None
        }
    }
}

/// Stitches tiles into one image, `tiles_per_row` to a row, in the order given. Each tile keeps its
/// own cell even when earlier tiles fail to decode; failed cells are filled with `PLACEHOLDER`.
/// Cell size is taken from the first tile that decodes. Returns `None` if none do.
#[instrument(skip(tiles), fields(num_tiles = tiles.len()))]
pub fn assemble<T: AsRef<[u8]>>(tiles: &[T], tiles_per_row: u32) -> Option<RgbImage> {
    let tiles_per_row = tiles_per_row.max(1);
    let decoded: Vec<Option<RgbImage>> = tiles
        .iter()
        .enumerate()
        .map(|(index, bytes)| decode_tile(index, bytes.as_ref()))
        .collect();

    let (tile_width, tile_height) = match decoded.iter().flatten().next() {
        Some(first) => first.dimensions(),
        None => {
            warn!("no tiles could be decoded, nothing to assemble");
            return None;
        }
    };

    let rows = (decoded.len() as u32 + tiles_per_row - 1) / tiles_per_row;
    let mut canvas = RgbImage::from_pixel(tile_width * tiles_per_row, tile_height * rows, PLACEHOLDER);
    for (index, tile) in decoded.iter().enumerate() {
        if let Some(tile) = tile {
            let index = index as u32;
            let col = index % tiles_per_row;
            let row = index / tiles_per_row;
            let cell = if tile.dimensions() == (tile_width, tile_height) {
                tile.clone()
            } else {
                warn!(index, dimensions = ?tile.dimensions(), "tile size differs from first tile, cropping");
                imageops::crop_imm(tile, 0, 0, tile_width, tile_height).to_image()
            };
            imageops::replace(
                &mut canvas,
                &cell,
                (col * tile_width) as i64,
                (row * tile_height) as i64,
            );
        }
    }
    info!(
        width = canvas.width(),
        height = canvas.height(),
        "assembled panorama"
    );
    Some(canvas)
}
