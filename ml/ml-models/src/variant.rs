//! Forward-pass variants of the autoencoder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Where the adversarial regressor taps the latent code, fixed at
/// construction.
///
/// | variant | mode | projection | detach |
/// |---|---|---|---|
/// | [`SampleThenRegress`](Self::SampleThenRegress) | 1 | off | off |
/// | [`RegressThenSample`](Self::RegressThenSample) | 2 | off | off |
/// | [`ProjectSampled`](Self::ProjectSampled) | 1 | on | off |
/// | [`ProjectMean`](Self::ProjectMean) | 2 | on | off |
/// | [`ProjectDetached`](Self::ProjectDetached) | 2 | on | on |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ForwardVariant {
    /// Encode, reparameterize, regress on the sampled features, decode.
    #[default]
    SampleThenRegress,
    /// Encode, regress on the mean features, reparameterize, decode.
    RegressThenSample,
    /// Encode, reparameterize, project the sampled features, regress on the
    /// projection, decode the projection joined with the attribute.
    ProjectSampled,
    /// Encode, project the mean features, regress on the projection,
    /// reparameterize around the projected mean, decode.
    ProjectMean,
    /// As [`ProjectMean`](Self::ProjectMean), but the regressor sees a
    /// projection of a detached copy of the features, so its loss never
    /// reaches the encoder.
    ProjectDetached,
}

impl ForwardVariant {
    /// All variants.
    pub const ALL: [Self; 5] = [
        Self::SampleThenRegress,
        Self::RegressThenSample,
        Self::ProjectSampled,
        Self::ProjectMean,
        Self::ProjectDetached,
    ];

    /// Resolve the variant from its selector flags.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] for a mode other than 1 or 2,
    /// or for a combination no variant implements (detach without
    /// projection, or detach in mode 1).
    ///
    /// # Example
    ///
    /// ```
    /// use ml_models::ForwardVariant;
    ///
    /// let variant = ForwardVariant::resolve(2, true, false).unwrap();
    /// assert_eq!(variant, ForwardVariant::ProjectMean);
    /// assert!(ForwardVariant::resolve(1, false, true).is_err());
    /// ```
    pub fn resolve(mode: u8, extra_layers: bool, detach_features: bool) -> Result<Self> {
        match (mode, extra_layers, detach_features) {
            (1, false, false) => Ok(Self::SampleThenRegress),
            (2, false, false) => Ok(Self::RegressThenSample),
            (1, true, false) => Ok(Self::ProjectSampled),
            (2, true, false) => Ok(Self::ProjectMean),
            (2, true, true) => Ok(Self::ProjectDetached),
            _ => Err(ModelError::invalid_config(format!(
                "no forward variant for mode {mode}, extra_layers {extra_layers}, detach_features {detach_features}"
            ))),
        }
    }

    /// Selector flags `(mode, extra_layers, detach_features)`.
    #[must_use]
    pub const fn flags(self) -> (u8, bool, bool) {
        match self {
            Self::SampleThenRegress => (1, false, false),
            Self::RegressThenSample => (2, false, false),
            Self::ProjectSampled => (1, true, false),
            Self::ProjectMean => (2, true, false),
            Self::ProjectDetached => (2, true, true),
        }
    }

    /// Whether the feature projection sub-network is used.
    #[must_use]
    pub const fn uses_projection(self) -> bool {
        self.flags().1
    }

    /// Short identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SampleThenRegress => "sample-then-regress",
            Self::RegressThenSample => "regress-then-sample",
            Self::ProjectSampled => "project-sampled",
            Self::ProjectMean => "project-mean",
            Self::ProjectDetached => "project-detached",
        }
    }
}

impl fmt::Display for ForwardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
