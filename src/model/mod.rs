//! Face landmark inference
//!
//! A candle conv-net regressor producing 468 2D landmarks and a
//! face-presence score for a single face per frame.

pub mod fetch;

use crate::errors::{Result, TrackerError};
use crate::setup::manifest::{MODEL_CONFIG_FILE, WEIGHTS_FILE};
use crate::video::Frame;
use candle_core::{DType, Device, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model hyperparameters, loaded from `face_landmarker.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkerConfig {
    /// Square input edge in pixels
    pub input_size: usize,
    pub num_landmarks: usize,
    /// Output channels of each stride-2 backbone block
    pub channels: Vec<usize>,
    /// Width of the shared fully-connected trunk
    pub hidden: usize,
}

impl Default for LandmarkerConfig {
    fn default() -> Self {
        LandmarkerConfig {
            input_size: 256,
            num_landmarks: crate::output::NUM_LANDMARKS,
            channels: vec![16, 32, 64, 128],
            hidden: 512,
        }
    }
}

/// Landmarks for one detected face, in pixel coordinates of the source frame
#[derive(Debug, Clone)]
pub struct Detection {
    pub landmarks: Vec<[f32; 2]>,
    pub presence: f32,
}

/// Single-face landmark regressor
pub struct FaceLandmarker {
    blocks: Vec<Conv2d>,
    trunk: Linear,
    head_landmarks: Linear,
    head_presence: Linear,
    config: LandmarkerConfig,
    device: Device,
}

impl FaceLandmarker {
    /// Load the model from a provisioned models directory
    pub fn load(models_dir: &Path) -> Result<Self> {
        let config_path = models_dir.join(MODEL_CONFIG_FILE);
        let weights_path = models_dir.join(WEIGHTS_FILE);

        let config_contents = std::fs::read_to_string(&config_path)?;
        let config: LandmarkerConfig = serde_json::from_str(&config_contents)?;

        let device = Device::Cpu;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)?
        };

        Self::build(vb, config, device)
    }

    fn build(vb: VarBuilder, config: LandmarkerConfig, device: Device) -> Result<Self> {
        let conv_cfg = Conv2dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };

        let mut blocks = Vec::with_capacity(config.channels.len());
        let mut in_channels = 3;
        let vb_backbone = vb.pp("backbone");
        for (i, &out_channels) in config.channels.iter().enumerate() {
            let block = conv2d(
                in_channels,
                out_channels,
                3,
                conv_cfg,
                vb_backbone.pp(i.to_string()),
            )?;
            blocks.push(block);
            in_channels = out_channels;
        }

        // Each block halves the spatial edge
        let final_edge = config.input_size >> config.channels.len();
        let trunk_in = in_channels * final_edge * final_edge;

        let trunk = linear(trunk_in, config.hidden, vb.pp("trunk"))?;
        let head_landmarks = linear(
            config.hidden,
            config.num_landmarks * 2,
            vb.pp("head_landmarks"),
        )?;
        let head_presence = linear(config.hidden, 1, vb.pp("head_presence"))?;

        Ok(FaceLandmarker {
            blocks,
            trunk,
            head_landmarks,
            head_presence,
            config,
            device,
        })
    }

    pub fn config(&self) -> &LandmarkerConfig {
        &self.config
    }

    /// Run inference on a frame. Returns `None` when the face-presence
    /// score falls below `presence_threshold`.
    pub fn detect(&self, frame: &Frame, presence_threshold: f32) -> Result<Option<Detection>> {
        let input = frame_to_tensor(frame, self.config.input_size, &self.device)?;
        let (coords, presence) = self.forward(&input)?;

        if presence < presence_threshold {
            return Ok(None);
        }

        let landmarks = scale_points(&coords, frame.width, frame.height);
        Ok(Some(Detection {
            landmarks,
            presence,
        }))
    }

    /// Forward pass: normalized landmark coordinates and presence score
    fn forward(&self, input: &Tensor) -> Result<(Vec<f32>, f32)> {
        let mut x = input.clone();
        for block in &self.blocks {
            x = block.forward(&x)?.relu()?;
        }

        let features = self.trunk.forward(&x.flatten_from(1)?)?.relu()?;

        let coords = self
            .head_landmarks
            .forward(&features)?
            .squeeze(0)?
            .to_vec1::<f32>()?;
        let presence = candle_nn::ops::sigmoid(&self.head_presence.forward(&features)?)?
            .squeeze(0)?
            .squeeze(0)?
            .to_scalar::<f32>()?;

        Ok((coords, presence))
    }
}

/// Resize a decoded RGB24 frame to the model input and lay it out as a
/// normalized CHW tensor.
fn frame_to_tensor(frame: &Frame, input_size: usize, device: &Device) -> Result<Tensor> {
    let img = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| TrackerError::Config("Frame buffer does not match dimensions".to_string()))?;

    let resized = image::imageops::resize(
        &img,
        input_size as u32,
        input_size as u32,
        image::imageops::FilterType::Triangle,
    );

    let pixels = resized.as_raw();
    let plane = input_size * input_size;
    let mut chw = vec![0f32; 3 * plane];
    for (i, px) in pixels.chunks_exact(3).enumerate() {
        chw[i] = px[0] as f32 / 255.0;
        chw[plane + i] = px[1] as f32 / 255.0;
        chw[2 * plane + i] = px[2] as f32 / 255.0;
    }

    let tensor = Tensor::from_vec(chw, (1, 3, input_size, input_size), device)?;
    Ok(tensor)
}

/// Map interleaved normalized (x, y) pairs onto pixel coordinates of the
/// source frame, the same conversion as `x * width, y * height`.
fn scale_points(coords: &[f32], width: u32, height: u32) -> Vec<[f32; 2]> {
    coords
        .chunks_exact(2)
        .map(|xy| [xy[0] * width as f32, xy[1] * height as f32])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame {
            index: 1,
            width,
            height,
            data: vec![value; Frame::size_bytes(width, height)],
        }
    }

    #[test]
    fn test_config_round_trip() {
        let config = LandmarkerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LandmarkerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.num_landmarks, 468);
        assert_eq!(parsed.input_size, 256);
    }

    #[test]
    fn test_frame_to_tensor_shape() {
        let frame = solid_frame(64, 48, 128);
        let tensor = frame_to_tensor(&frame, 32, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[1, 3, 32, 32]);
    }

    #[test]
    fn test_frame_to_tensor_normalization() {
        let frame = solid_frame(16, 16, 255);
        let tensor = frame_to_tensor(&frame, 8, &Device::Cpu).unwrap();
        let max = tensor.flatten_all().unwrap().max(0).unwrap().to_scalar::<f32>().unwrap();
        assert!((max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_to_tensor_rejects_bad_buffer() {
        let frame = Frame {
            index: 1,
            width: 16,
            height: 16,
            data: vec![0; 10],
        };
        assert!(frame_to_tensor(&frame, 8, &Device::Cpu).is_err());
    }

    #[test]
    fn test_scale_points() {
        let coords = [0.0, 0.0, 0.5, 0.5, 1.0, 1.0];
        let points = scale_points(&coords, 1280, 720);
        assert_eq!(points, vec![[0.0, 0.0], [640.0, 360.0], [1280.0, 720.0]]);
    }

    #[test]
    fn test_forward_output_shapes() {
        // Zero-initialized weights are enough to pin the output contract
        let config = LandmarkerConfig {
            input_size: 32,
            num_landmarks: 468,
            channels: vec![8, 16],
            hidden: 64,
        };
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let model = FaceLandmarker::build(vb, config, Device::Cpu).unwrap();

        let frame = solid_frame(64, 64, 100);
        let input = frame_to_tensor(&frame, 32, &Device::Cpu).unwrap();
        let (coords, presence) = model.forward(&input).unwrap();

        assert_eq!(coords.len(), 468 * 2);
        // Sigmoid of a zero logit
        assert!((presence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_detect_below_threshold_is_none() {
        let config = LandmarkerConfig {
            input_size: 32,
            num_landmarks: 468,
            channels: vec![8, 16],
            hidden: 64,
        };
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let model = FaceLandmarker::build(vb, config, Device::Cpu).unwrap();

        let frame = solid_frame(64, 64, 100);
        // Zero weights give presence 0.5 exactly; 0.6 gates it out
        let detection = model.detect(&frame, 0.6).unwrap();
        assert!(detection.is_none());

        let detection = model.detect(&frame, 0.4).unwrap().unwrap();
        assert_eq!(detection.landmarks.len(), 468);
    }
}
