//! MobileNetV2 wildfire classifier on candle
//!
//! Loads a torchvision `mobilenet_v2` state dict whose final linear layer was
//! replaced by a 2-class head (`classifier.1`). Both PyTorch pickles (`.pth`)
//! and `.safetensors` exports are accepted. Batch norms are folded into a
//! per-channel scale and shift at load time; inference is eval-mode only.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor, D};
use tracing::info;

use super::classifier::{check_input_size, softmax, Classifier, ClassifierError, NUM_CLASSES};
use super::preprocess::{ImageTensor, NUM_CHANNELS};
use crate::config::defaults::BATCH_NORM_EPS;
use crate::config::DevicePreference;
use crate::types::millis;

/// `(expand ratio, output channels, repeats, first stride)` per stage.
const INVERTED_RESIDUAL_SETTINGS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

const STEM_CHANNELS: usize = 32;
const LAST_CHANNELS: usize = 1280;

/// True when this build has CUDA support and a CUDA runtime is detected.
pub fn is_cuda_available() -> bool {
    #[cfg(feature = "cuda")]
    {
        std::env::var("CUDA_VISIBLE_DEVICES").is_ok()
            || Path::new("/usr/local/cuda").exists()
            || Path::new("/opt/cuda").exists()
            || Path::new("/usr/lib/x86_64-linux-gnu/libcuda.so").exists()
    }
    #[cfg(not(feature = "cuda"))]
    {
        false
    }
}

pub fn select_device(preference: DevicePreference) -> Result<Device, ClassifierError> {
    let want_cuda = match preference {
        DevicePreference::Cpu => false,
        DevicePreference::Cuda => true,
        DevicePreference::Auto => is_cuda_available(),
    };

    if !want_cuda {
        info!("Using CPU inference");
        return Ok(Device::Cpu);
    }

    #[cfg(feature = "cuda")]
    {
        info!("CUDA requested, using GPU inference");
        Ok(Device::cuda_if_available(0)?)
    }
    #[cfg(not(feature = "cuda"))]
    {
        tracing::warn!("CUDA feature not compiled in, falling back to CPU");
        Ok(Device::Cpu)
    }
}

// ============================================================================
// Weight loading
// ============================================================================

/// Named tensors read from a state dict, consumed as layers are built.
struct StateDict {
    tensors: HashMap<String, Tensor>,
    device: Device,
}

impl StateDict {
    fn read(path: &Path, device: Device) -> Result<Self, ClassifierError> {
        std::fs::metadata(path).map_err(|e| ClassifierError::Io(path.to_path_buf(), e))?;

        let is_safetensors = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("safetensors"));
        let raw: Vec<(String, Tensor)> = if is_safetensors {
            candle_core::safetensors::load(path, &Device::Cpu)?
                .into_iter()
                .collect()
        } else {
            candle_core::pickle::read_all(path)?
        };

        // Checkpoints saved from DataParallel carry a `module.` prefix.
        let tensors = raw
            .into_iter()
            .map(|(name, t)| (name.strip_prefix("module.").unwrap_or(&name).to_string(), t))
            .collect();
        Ok(Self { tensors, device })
    }

    fn take(&mut self, name: &str) -> Result<Tensor, ClassifierError> {
        let tensor = self
            .tensors
            .remove(name)
            .ok_or_else(|| ClassifierError::MissingTensor(name.to_string()))?;
        Ok(tensor.to_dtype(DType::F32)?.to_device(&self.device)?)
    }
}

/// Convolution followed by a folded batch norm and optional ReLU6.
struct ConvBn {
    weight: Tensor,
    scale: Tensor,
    shift: Tensor,
    stride: usize,
    padding: usize,
    groups: usize,
    relu6: bool,
}

impl ConvBn {
    fn load(
        dict: &mut StateDict,
        conv: &str,
        bn: &str,
        stride: usize,
        depthwise: bool,
        relu6: bool,
    ) -> Result<Self, ClassifierError> {
        let weight = dict.take(&format!("{conv}.weight"))?;
        let (out_channels, _, kernel, _) = weight.dims4()?;

        let gamma = dict.take(&format!("{bn}.weight"))?;
        let beta = dict.take(&format!("{bn}.bias"))?;
        let mean = dict.take(&format!("{bn}.running_mean"))?;
        let var = dict.take(&format!("{bn}.running_var"))?;

        let scale = gamma.div(&var.affine(1.0, BATCH_NORM_EPS)?.sqrt()?)?;
        let shift = beta.sub(&mean.mul(&scale)?)?;

        Ok(Self {
            weight,
            scale: scale.reshape((1, out_channels, 1, 1))?,
            shift: shift.reshape((1, out_channels, 1, 1))?,
            stride,
            padding: kernel / 2,
            groups: if depthwise { out_channels } else { 1 },
            relu6,
        })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let y = x
            .conv2d(&self.weight, self.padding, self.stride, 1, self.groups)?
            .broadcast_mul(&self.scale)?
            .broadcast_add(&self.shift)?;
        if self.relu6 {
            y.clamp(0f32, 6f32)
        } else {
            Ok(y)
        }
    }
}

struct InvertedResidual {
    expand: Option<ConvBn>,
    depthwise: ConvBn,
    project: ConvBn,
    residual: bool,
}

impl InvertedResidual {
    fn load(
        dict: &mut StateDict,
        index: usize,
        expand_ratio: usize,
        stride: usize,
        residual: bool,
    ) -> Result<Self, ClassifierError> {
        let p = format!("features.{index}.conv");
        if expand_ratio == 1 {
            Ok(Self {
                expand: None,
                depthwise: ConvBn::load(dict, &format!("{p}.0.0"), &format!("{p}.0.1"), stride, true, true)?,
                project: ConvBn::load(dict, &format!("{p}.1"), &format!("{p}.2"), 1, false, false)?,
                residual,
            })
        } else {
            Ok(Self {
                expand: Some(ConvBn::load(dict, &format!("{p}.0.0"), &format!("{p}.0.1"), 1, false, true)?),
                depthwise: ConvBn::load(dict, &format!("{p}.1.0"), &format!("{p}.1.1"), stride, true, true)?,
                project: ConvBn::load(dict, &format!("{p}.2"), &format!("{p}.3"), 1, false, false)?,
                residual,
            })
        }
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mut y = match &self.expand {
            Some(expand) => expand.forward(x)?,
            None => x.clone(),
        };
        y = self.depthwise.forward(&y)?;
        y = self.project.forward(&y)?;
        if self.residual {
            y + x
        } else {
            Ok(y)
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// MobileNetV2 backbone with a 2-class linear head.
pub struct MobileNetV2 {
    stem: ConvBn,
    blocks: Vec<InvertedResidual>,
    head: ConvBn,
    fc_weight: Tensor,
    fc_bias: Tensor,
    device: Device,
}

impl MobileNetV2 {
    /// Load trained weights onto the preferred device.
    pub fn load(path: &Path, preference: DevicePreference) -> Result<Self, ClassifierError> {
        let start = std::time::Instant::now();
        let device = select_device(preference)?;
        let mut dict = StateDict::read(path, device.clone())?;

        let stem = ConvBn::load(&mut dict, "features.0.0", "features.0.1", 2, false, true)?;

        let mut blocks = Vec::new();
        let mut in_channels = STEM_CHANNELS;
        let mut index = 1;
        for (expand_ratio, out_channels, repeats, first_stride) in INVERTED_RESIDUAL_SETTINGS {
            for r in 0..repeats {
                let stride = if r == 0 { first_stride } else { 1 };
                let residual = stride == 1 && in_channels == out_channels;
                blocks.push(InvertedResidual::load(&mut dict, index, expand_ratio, stride, residual)?);
                in_channels = out_channels;
                index += 1;
            }
        }

        let head = ConvBn::load(
            &mut dict,
            &format!("features.{index}.0"),
            &format!("features.{index}.1"),
            1,
            false,
            true,
        )?;

        let fc_weight = dict.take("classifier.1.weight")?;
        let fc_bias = dict.take("classifier.1.bias")?;
        if fc_weight.dims() != [NUM_CLASSES, LAST_CHANNELS] || fc_bias.dims() != [NUM_CLASSES] {
            return Err(ClassifierError::InvalidWeights(format!(
                "classifier head is {:?}, expected [{NUM_CLASSES}, {LAST_CHANNELS}]",
                fc_weight.dims()
            )));
        }

        info!(
            path = %path.display(),
            device = ?device,
            blocks = blocks.len(),
            elapsed_ms = millis(start.elapsed()),
            "Loaded MobileNetV2 weights"
        );

        Ok(Self {
            stem,
            blocks,
            head,
            fc_weight,
            fc_bias,
            device,
        })
    }

    fn logits(&self, input: &ImageTensor) -> candle_core::Result<Vec<f32>> {
        let size = input.size() as usize;
        let x = Tensor::from_slice(input.data(), (1, NUM_CHANNELS, size, size), &self.device)?;

        let mut x = self.stem.forward(&x)?;
        for block in &self.blocks {
            x = block.forward(&x)?;
        }
        let x = self.head.forward(&x)?;

        // Global average pool, then the linear head (dropout is a no-op in eval).
        let pooled = x.mean(D::Minus1)?.mean(D::Minus1)?;
        pooled
            .matmul(&self.fc_weight.t()?)?
            .broadcast_add(&self.fc_bias)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }
}

impl Classifier for MobileNetV2 {
    fn name(&self) -> &str {
        "mobilenet_v2"
    }

    fn classify(&self, input: &ImageTensor) -> Result<[f32; NUM_CLASSES], ClassifierError> {
        check_input_size(input)?;
        let logits: [f32; NUM_CLASSES] = self.logits(input)?.try_into().map_err(|v: Vec<f32>| {
            ClassifierError::InvalidWeights(format!("head produced {} logits", v.len()))
        })?;
        softmax(logits)
    }
}
