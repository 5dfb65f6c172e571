use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use umathyoi_calc::constants::URA_FINALS_NAME;
use umathyoi_calc::{CardCatalog, DataLoader, LoadError, Scenario};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid card catalog {path}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
}

/// Reads cards, scenarios and caller documents from JSON files.
///
/// Scenario and document names are file paths, except the built-in
/// URA Finals scenario which needs no file.
#[derive(Debug, Clone)]
pub struct FileLoader {
    cards_path: PathBuf,
}

impl FileLoader {
    #[must_use]
    pub fn new(cards_path: impl Into<PathBuf>) -> Self {
        Self {
            cards_path: cards_path.into(),
        }
    }

    fn read(path: &Path) -> Result<String, LoaderError> {
        fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DataLoader for FileLoader {
    type Error = LoaderError;

    fn load_cards(&self) -> Result<CardCatalog, Self::Error> {
        let json = Self::read(&self.cards_path)?;
        let catalog = CardCatalog::from_json(&json).map_err(|source| LoaderError::Catalog {
            path: self.cards_path.clone(),
            source,
        })?;
        log::debug!(
            "loaded {} cards from {}",
            catalog.len(),
            self.cards_path.display()
        );
        Ok(catalog)
    }

    fn load_scenario(&self, name: &str) -> Result<Scenario, Self::Error> {
        if name == URA_FINALS_NAME {
            return Ok(Scenario::ura_finals());
        }
        self.load_config(name)
    }

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        let path = PathBuf::from(config_name);
        let json = Self::read(&path)?;
        serde_json::from_str(&json).map_err(|source| LoaderError::Parse { path, source })
    }
}
