//! Checkpoint persistence for model weights.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder, Recorder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, Result};

/// Sub-directory of an experiment's output directory holding checkpoints.
pub const CHECKPOINT_DIR: &str = "checkpoints";

/// Supported checkpoint file formats.
///
/// # Example
///
/// ```
/// use ml_models::CheckpointFormat;
///
/// let format = CheckpointFormat::from_extension("bin");
/// assert_eq!(format, Some(CheckpointFormat::Binary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckpointFormat {
    /// Compact full-precision binary (`BinFileRecorder`).
    #[default]
    Binary,

    /// Pretty-printed JSON (`PrettyJsonFileRecorder`), for inspection.
    Json,
}

impl CheckpointFormat {
    /// Determines format from file extension.
    ///
    /// - `.bin`, `.burn` -> Binary
    /// - `.json` -> Json
    /// - Other -> None
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" | "burn" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the default file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Saves a model's weights next to `stem`, appending the format extension.
///
/// Returns the full path written.
///
/// # Errors
///
/// Returns [`ModelError::SaveCheckpoint`] if the recorder fails.
///
/// # Example
///
/// ```ignore
/// let path = save_checkpoint(&model, out_dir.join("autoencoder_epoch_0010"), CheckpointFormat::Binary)?;
/// ```
pub fn save_checkpoint<B, M>(model: &M, stem: impl AsRef<Path>, format: CheckpointFormat) -> Result<PathBuf>
where
    B: Backend,
    M: Module<B>,
{
    let mut name = stem.as_ref().as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    let path = PathBuf::from(name);
    let record = model.clone().into_record();
    let failed = |e: burn::record::RecorderError| ModelError::save_checkpoint(path.display().to_string(), e.to_string());

    match format {
        CheckpointFormat::Binary => {
            Recorder::<B>::record(&BinFileRecorder::<FullPrecisionSettings>::new(), record, path.clone()).map_err(failed)?;
        }
        CheckpointFormat::Json => {
            Recorder::<B>::record(&PrettyJsonFileRecorder::<FullPrecisionSettings>::new(), record, path.clone())
                .map_err(failed)?;
        }
    }

    info!(path = %path.display(), %format, "Saved checkpoint");
    Ok(path)
}

/// Loads weights from `path` into `model`.
///
/// The format is taken from the file extension.
///
/// # Errors
///
/// Returns [`ModelError::CheckpointNotFound`] if the file is missing,
/// [`ModelError::UnsupportedFormat`] for an unknown extension, and
/// [`ModelError::LoadCheckpoint`] if the record does not fit the model.
pub fn load_checkpoint<B, M>(model: M, path: impl AsRef<Path>, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    let shown = path.display().to_string();
    if !path.exists() {
        return Err(ModelError::checkpoint_not_found(shown));
    }
    let format = CheckpointFormat::from_path(path).ok_or_else(|| ModelError::unsupported_format(shown.clone()))?;

    let loaded = match format {
        CheckpointFormat::Binary => model.load_file(path, &BinFileRecorder::<FullPrecisionSettings>::new(), device),
        CheckpointFormat::Json => model.load_file(path, &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(), device),
    }
    .map_err(|e| ModelError::load_checkpoint(shown.clone(), e.to_string()))?;

    info!(path = %shown, %format, "Loaded checkpoint");
    Ok(loaded)
}

/// Finds the newest checkpoint in `dir` whose file name contains `key`.
///
/// Checkpoint names embed a zero-padded epoch, so the lexicographically
/// last match is the newest. Returns `None` if `dir` does not exist or
/// nothing matches.
///
/// # Errors
///
/// Returns [`ModelError::Io`] if an existing directory cannot be read.
pub fn latest_checkpoint(dir: impl AsRef<Path>, key: &str) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || CheckpointFormat::from_path(&path).is_none() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(key));
        let newer = latest.as_ref().map_or(true, |best| path.file_name() > best.file_name());
        if matches && newer {
            latest = Some(path);
        }
    }

    debug!(dir = %dir.display(), key, found = ?latest, "Checkpoint lookup");
    Ok(latest)
}

/// Ensures `<output_dir>/checkpoints` exists and returns it.
///
/// # Errors
///
/// Returns [`ModelError::Io`] if the directory cannot be created.
pub fn checkpoint_dir(output_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = output_dir.as_ref().join(CHECKPOINT_DIR);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FactorDiscriminator;
    use burn::tensor::{Distribution, Tensor};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn format_from_extension() {
        assert_eq!(CheckpointFormat::from_extension("bin"), Some(CheckpointFormat::Binary));
        assert_eq!(CheckpointFormat::from_extension("burn"), Some(CheckpointFormat::Binary));
        assert_eq!(CheckpointFormat::from_extension("json"), Some(CheckpointFormat::Json));
        assert_eq!(CheckpointFormat::from_extension("BIN"), Some(CheckpointFormat::Binary));
        assert_eq!(CheckpointFormat::from_extension("pt"), None);
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            CheckpointFormat::from_path(Path::new("/runs/a/checkpoints/model_0003.burn")),
            Some(CheckpointFormat::Binary)
        );
        assert_eq!(CheckpointFormat::from_path(Path::new("model.json")), Some(CheckpointFormat::Json));
        assert_eq!(CheckpointFormat::from_path(Path::new("model")), None);
    }

    #[test]
    fn format_display() {
        assert_eq!(CheckpointFormat::Binary.to_string(), "binary");
        assert_eq!(CheckpointFormat::Json.extension(), "json");
    }

    #[test]
    fn round_trip_preserves_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let device = <TestBackend as Backend>::Device::default();
        let critic = FactorDiscriminator::<TestBackend>::with_hidden(4, 8, &device);
        let z = Tensor::<TestBackend, 2>::random([3, 4], Distribution::Default, &device);
        let expected = critic.forward(z.clone()).into_data().to_vec::<f32>().unwrap();

        for format in [CheckpointFormat::Binary, CheckpointFormat::Json] {
            let path = save_checkpoint(&critic, dir.path().join("critic"), format).unwrap();
            assert_eq!(CheckpointFormat::from_path(&path), Some(format));

            let fresh = FactorDiscriminator::<TestBackend>::with_hidden(4, 8, &device);
            let loaded = load_checkpoint(fresh, &path, &device).unwrap();
            let actual = loaded.forward(z.clone()).into_data().to_vec::<f32>().unwrap();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn load_missing_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let device = <TestBackend as Backend>::Device::default();
        let critic = FactorDiscriminator::<TestBackend>::with_hidden(4, 8, &device);

        let missing = load_checkpoint(critic.clone(), dir.path().join("nope.bin"), &device);
        assert!(matches!(missing, Err(ModelError::CheckpointNotFound(_))));

        let odd = dir.path().join("weights.pt");
        fs::write(&odd, b"not a checkpoint").unwrap();
        let unknown = load_checkpoint(critic, &odd, &device);
        assert!(matches!(unknown, Err(ModelError::UnsupportedFormat(_))));
    }

    #[test]
    fn latest_checkpoint_picks_last_matching_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "autoencoder_0002.bin",
            "autoencoder_0010.bin",
            "autoencoder_0009.json",
            "discriminator_0042.bin",
            "autoencoder_0099.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("autoencoder_9999.bin")).unwrap();

        let latest = latest_checkpoint(dir.path(), "autoencoder").unwrap();
        assert_eq!(latest, Some(dir.path().join("autoencoder_0010.bin")));

        assert_eq!(latest_checkpoint(dir.path(), "regressor").unwrap(), None);
        assert_eq!(latest_checkpoint(dir.path().join("absent"), "autoencoder").unwrap(), None);
    }

    #[test]
    fn checkpoint_dir_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let first = checkpoint_dir(dir.path()).unwrap();
        let second = checkpoint_dir(dir.path()).unwrap();
        assert_eq!(first, dir.path().join(CHECKPOINT_DIR));
        assert_eq!(first, second);
        assert!(first.is_dir());
    }
}
