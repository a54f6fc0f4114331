//! Model artifact persistence.
//!
//! A fitted model is stored as a family of files sharing one prefix:
//!
//! | file                 | content                                  |
//! |----------------------|------------------------------------------|
//! | `<prefix>.lik`       | log-likelihood per sweep, one per line   |
//! | `<prefix>.theta`     | `D × K` dense matrix                     |
//! | `<prefix>.n_mz`      | `D` lines of sparse `topic:count`        |
//! | `<prefix>.n_wz`      | `V` lines of sparse `topic:count`        |
//! | `<prefix>.phi`       | `K × V` dense matrix                     |
//! | `<prefix>.meta.json` | [`ModelMeta`]                            |
//!
//! Every file is staged in a temp file inside the target directory; nothing
//! is renamed into place until all of them were written. `<prefix>.meta.json`
//! is the commit marker: it is removed before the first rename and renamed
//! into place last, so an interrupted save leaves no loadable model behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use llda_types::format;
use llda_types::{LldaError, Result};

use crate::model::{Model, ModelMeta};

/// One file of the artifact family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Likelihood,
    Theta,
    DocTopicCounts,
    TermTopicCounts,
    Phi,
    Meta,
}

impl Artifact {
    /// Persist order. `Meta` stays last.
    pub const ALL: [Artifact; 6] = [
        Artifact::Likelihood,
        Artifact::Theta,
        Artifact::DocTopicCounts,
        Artifact::TermTopicCounts,
        Artifact::Phi,
        Artifact::Meta,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Artifact::Likelihood => "lik",
            Artifact::Theta => "theta",
            Artifact::DocTopicCounts => "n_mz",
            Artifact::TermTopicCounts => "n_wz",
            Artifact::Phi => "phi",
            Artifact::Meta => "meta.json",
        }
    }
}

/// Reads and writes a model under `dir/prefix.*`.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    prefix: String,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.prefix, artifact.extension()))
    }

    /// True when every artifact file is present.
    pub fn exists(&self) -> bool {
        Artifact::ALL.iter().all(|&a| self.path(a).is_file())
    }

    /// Write every artifact, then move them into place with the metadata last.
    pub fn save(&self, model: &Model) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut staged = Vec::with_capacity(Artifact::ALL.len());
        for artifact in Artifact::ALL {
            let file = NamedTempFile::new_in(&self.dir)?;
            {
                let mut writer = BufWriter::new(file.as_file());
                self.write_artifact(artifact, model, &mut writer)?;
                writer.flush()?;
            }
            staged.push((artifact, file));
        }

        match fs::remove_file(self.path(Artifact::Meta)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        for (artifact, file) in staged {
            let path = self.path(artifact);
            file.persist(&path).map_err(|e| LldaError::Io(e.error))?;
            debug!(path = %path.display(), "Wrote model artifact");
        }
        info!(dir = %self.dir.display(), prefix = %self.prefix, "Saved model");
        Ok(())
    }

    fn write_artifact<W: Write>(&self, artifact: Artifact, model: &Model, writer: W) -> Result<()> {
        match artifact {
            Artifact::Likelihood => format::write_vector(writer, model.likelihood()),
            Artifact::Theta => format::write_matrix(writer, model.theta()),
            Artifact::DocTopicCounts => format::write_sparse_counts(writer, model.n_mz()),
            Artifact::TermTopicCounts => format::write_sparse_counts(writer, model.n_wz()),
            Artifact::Phi => format::write_matrix(writer, model.phi()),
            Artifact::Meta => {
                serde_json::to_writer_pretty(writer, model.meta())?;
                Ok(())
            }
        }
    }

    /// Load a model, failing with `ModelNotFitted` if any artifact is absent.
    pub fn load(&self) -> Result<Model> {
        if let Some(missing) = Artifact::ALL.iter().find(|&&a| !self.path(a).is_file()) {
            return Err(LldaError::ModelNotFitted(format!(
                "missing artifact {}",
                self.path(*missing).display()
            )));
        }

        let meta: ModelMeta = serde_json::from_reader(self.open(Artifact::Meta)?)?;
        let likelihood = format::read_vector(self.open(Artifact::Likelihood)?)?;
        let theta = format::read_matrix(self.open(Artifact::Theta)?)?;
        let phi = format::read_matrix(self.open(Artifact::Phi)?)?;
        let n_mz = format::read_sparse_counts(self.open(Artifact::DocTopicCounts)?, meta.class_num)?;
        let n_wz =
            format::read_sparse_counts(self.open(Artifact::TermTopicCounts)?, meta.class_num)?;

        let model = Model::from_parts(meta, n_wz, n_mz, phi, theta, likelihood)?;
        info!(
            dir = %self.dir.display(),
            topics = model.class_num(),
            vocab = model.vocab_size(),
            "Loaded model"
        );
        Ok(model)
    }

    fn open(&self, artifact: Artifact) -> Result<BufReader<File>> {
        Ok(BufReader::new(File::open(self.path(artifact))?))
    }
}
