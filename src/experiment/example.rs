use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::train::{Evaluation, TrainConfig};

/// The four runnable experiments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Example {
    MnistMlp,
    MnistCnn,
    Cifar10Cnn,
    Cifar10Resnet,
}

/// Training knobs an experiment starts from; callers may override any field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// A batch point is charted every this many steps.
    pub batch_log_every: usize,
    pub evaluation: Evaluation,
}

impl Hyperparams {
    pub fn train_config(&self, seed: u64) -> TrainConfig {
        let mut config = TrainConfig::new(self.epochs, self.batch_size);
        config.learning_rate = self.learning_rate;
        config.batch_log_every = self.batch_log_every;
        config.evaluation = self.evaluation;
        config.seed = seed;
        config
    }
}

impl Example {
    pub const ALL: [Example; 4] = [
        Example::MnistMlp,
        Example::MnistCnn,
        Example::Cifar10Cnn,
        Example::Cifar10Resnet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Example::MnistMlp => "mnist-mlp",
            Example::MnistCnn => "mnist-cnn",
            Example::Cifar10Cnn => "cifar10-cnn",
            Example::Cifar10Resnet => "cifar10-resnet",
        }
    }

    /// Name of the dataset the experiment trains on.
    pub fn dataset(self) -> &'static str {
        match self {
            Example::MnistMlp | Example::MnistCnn => "mnist",
            Example::Cifar10Cnn | Example::Cifar10Resnet => "cifar10",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Example::MnistMlp => "MNIST, two dense layers of 512",
            Example::MnistCnn => "MNIST, one conv block and a dense layer of 128",
            Example::Cifar10Cnn => "CIFAR-10, two conv blocks and a dense layer of 512",
            Example::Cifar10Resnet => "CIFAR-10, ResNet-50",
        }
    }

    /// MNIST runs score every test image after each epoch; CIFAR-10 runs
    /// score the next 2000.
    pub fn defaults(self) -> Hyperparams {
        match self.dataset() {
            "mnist" => Hyperparams {
                epochs: 5,
                batch_size: 128,
                learning_rate: 1e-3,
                batch_log_every: 10,
                evaluation: Evaluation::Full,
            },
            _ => Hyperparams {
                epochs: 6,
                batch_size: 32,
                learning_rate: 1e-3,
                batch_log_every: 100,
                evaluation: Evaluation::Sample(2000),
            },
        }
    }
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown example '{0}' (expected one of mnist-mlp, mnist-cnn, cifar10-cnn, cifar10-resnet)")]
pub struct ParseExampleError(pub String);

impl FromStr for Example {
    type Err = ParseExampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Example::ALL
            .into_iter()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| ParseExampleError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for example in Example::ALL {
            assert_eq!(example.name().parse::<Example>().unwrap(), example);
        }
        assert_eq!("CIFAR10_RESNET".parse::<Example>().unwrap(), Example::Cifar10Resnet);
        assert!("mnist-rnn".parse::<Example>().is_err());
    }

    #[test]
    fn defaults_follow_the_dataset() {
        let mnist = Example::MnistCnn.defaults();
        assert_eq!((mnist.batch_size, mnist.epochs, mnist.batch_log_every), (128, 5, 10));
        assert_eq!(mnist.evaluation, Evaluation::Full);

        let cifar = Example::Cifar10Resnet.defaults();
        assert_eq!((cifar.batch_size, cifar.epochs, cifar.batch_log_every), (32, 6, 100));
        assert_eq!(cifar.evaluation, Evaluation::Sample(2000));
    }

    #[test]
    fn train_config_carries_hyperparams() {
        let config = Example::Cifar10Cnn.defaults().train_config(9);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.batch_log_every, 100);
        assert_eq!(config.seed, 9);
        assert!(config.progress_tx.is_none());
    }

    #[test]
    fn serde_uses_kebab_case() {
        assert_eq!(serde_json::to_string(&Example::Cifar10Cnn).unwrap(), r#""cifar10-cnn""#);
    }
}
