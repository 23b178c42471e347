//! CNN Model Architecture for Eye Disease Classification
//!
//! Three convolutional stages followed by a small dense head:
//!
//! ```text
//! [B,3,256,256]
//!   conv3x3/s2 → BN → LeakyReLU → maxpool2   → [B,16,63,63]
//!   conv3x3/s2 → BN → LeakyReLU → maxpool2   → [B,32,15,15]
//!   conv3x3/s2 → BN → LeakyReLU → maxpool2   → [B,64,3,3]
//!   flatten → dropout → fc(576,128) → ReLU → dropout → fc(128,C)
//! ```
//!
//! Batch-norm statistics update and dropout fire only on an autodiff backend.
//! After `valid()` the same weights run in evaluation mode.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, LeakyRelu, LeakyReluConfig, Linear,
        LinearConfig, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Output channels of the three convolutional stages
pub const STAGE_CHANNELS: [usize; 3] = [16, 32, 64];

/// Width of the hidden dense layer
pub const HIDDEN_UNITS: usize = 128;

/// Configuration for the EyeDiseaseClassifier CNN model
#[derive(Config, Debug)]
pub struct EyeDiseaseClassifierConfig {
    /// Number of output classes
    #[config(default = "15")]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "256")]
    pub input_size: usize,

    /// Dropout rate applied before each dense layer
    #[config(default = "0.2")]
    pub dropout_rate: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Negative slope of the leaky ReLU in the conv stages
    #[config(default = "0.01")]
    pub leaky_slope: f64,
}

impl EyeDiseaseClassifierConfig {
    /// Number of features entering the dense head
    pub fn flattened_features(&self) -> usize {
        flattened_features(self.input_size)
    }

    /// Initialize a model with fresh parameters
    pub fn init<B: Backend>(&self, device: &B::Device) -> EyeDiseaseClassifier<B> {
        EyeDiseaseClassifier::new(self, device)
    }
}

/// Spatial size after one conv(k3, s2, no padding) + maxpool(2, s2) stage
fn stage_output_size(size: usize) -> usize {
    if size < 3 {
        return 0;
    }
    let conv = (size - 3) / 2 + 1;
    conv / 2
}

/// Flattened feature count for a square input; 0 means the input is too small
pub fn flattened_features(input_size: usize) -> usize {
    let side = (0..STAGE_CHANNELS.len()).fold(input_size, |size, _| stage_output_size(size));
    STAGE_CHANNELS[STAGE_CHANNELS.len() - 1] * side * side
}

/// Conv → BatchNorm → LeakyReLU → MaxPool
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B>,
    pub activation: LeakyRelu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvStage<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        leaky_slope: f64,
        device: &B::Device,
    ) -> Self {
        // Valid padding is the Conv2dConfig default
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([2, 2])
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        let activation = LeakyReluConfig::new()
            .with_negative_slope(leaky_slope)
            .init();
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            bn,
            activation,
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.activation.forward(x);
        self.pool.forward(x)
    }
}

/// Eye Disease Classifier CNN
#[derive(Module, Debug)]
pub struct EyeDiseaseClassifier<B: Backend> {
    pub stage1: ConvStage<B>,
    pub stage2: ConvStage<B>,
    pub stage3: ConvStage<B>,

    pub dropout: Dropout,
    pub fc1: Linear<B>,
    pub relu: Relu,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> EyeDiseaseClassifier<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &EyeDiseaseClassifierConfig, device: &B::Device) -> Self {
        let [c1, c2, c3] = STAGE_CHANNELS;
        let slope = config.leaky_slope;

        let stage1 = ConvStage::new(config.in_channels, c1, slope, device); // 256 -> 63
        let stage2 = ConvStage::new(c1, c2, slope, device); // 63 -> 15
        let stage3 = ConvStage::new(c2, c3, slope, device); // 15 -> 3

        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc1 = LinearConfig::new(config.flattened_features(), HIDDEN_UNITS).init(device);
        let fc2 = LinearConfig::new(HIDDEN_UNITS, config.num_classes).init(device);

        Self {
            stage1,
            stage2,
            stage3,
            dropout,
            fc1,
            relu: Relu::new(),
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.stage1.forward(x);
        let x = self.stage2.forward(x);
        let x = self.stage3.forward(x);

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.dropout.forward(x);
        let x = self.fc1.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
