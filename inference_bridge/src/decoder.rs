use crate::error::BridgeError;
use image::{imageops::FilterType, GenericImageView};
use ndarray::{Array, Ix4};

/// Decode an encoded image buffer into the NCHW float tensor the active
/// model expects, returning the original dimensions for rescaling boxes
/// back to image coordinates.
pub fn decode_image(
    image_data: &[u8],
    input_size: u32,
) -> Result<(Array<f32, Ix4>, u32, u32), BridgeError> {
    let image_reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| BridgeError::DecodeError(e.to_string()))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| BridgeError::DecodeError(e.to_string()))?;

    let (img_width, img_height) = original_img.dimensions();
    let img = original_img.resize_exact(input_size, input_size, FilterType::CatmullRom);

    let size = input_size as usize;
    let mut input = Array::zeros((1, 3, size, size));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    Ok((input, img_width, img_height))
}
