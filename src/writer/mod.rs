//! Materializes a record stream as a generic dataset on disk.
//!
//! The output mirrors what [`crate::loader::load`] reads: a `config.json`
//! in the root and `train/`, `dev/` and `test/` folders with `images/` and
//! `labels/`. Files are named with a zero-padded counter.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::BeardError;
use crate::imaging::{ImageCrate, ImageService};
use crate::ir::{Record, Split};
use crate::schema::{encode_row, RecordConfig};

/// Name of the config file written next to the split folders.
pub const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Remove existing output before writing.
    pub clean: bool,
    /// Counter value of the first stored record.
    pub start_id: u64,
    /// Image file extension, which also selects the encoder.
    pub image_extension: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            clean: false,
            start_id: 0,
            image_extension: "jpg".to_string(),
        }
    }
}

impl StoreOptions {
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn start_id(mut self, start_id: u64) -> Self {
        self.start_id = start_id;
        self
    }

    pub fn image_extension(mut self, extension: impl Into<String>) -> Self {
        self.image_extension = extension.into();
        self
    }
}

/// One record that made it to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: u64,
    pub split: Split,
    pub image_path: PathBuf,
    pub label_path: PathBuf,
}

/// Prepares `folder` and returns a writer that stores one record per pull.
///
/// The config is written with every box-array re-declared as absolute y-x,
/// which is the convention records carry.
pub fn store<I>(
    records: I,
    config: &RecordConfig,
    folder: &Path,
    options: StoreOptions,
) -> Result<Writer<I::IntoIter>, BeardError>
where
    I: IntoIterator<Item = Result<Record, BeardError>>,
{
    Writer::with_service(records, config, folder, options, ImageCrate)
}

/// Lazy writer; see [`store`].
pub struct Writer<I, S: ImageService = ImageCrate> {
    records: I,
    config: RecordConfig,
    root: PathBuf,
    options: StoreOptions,
    service: S,
    counter: u64,
    written: usize,
    test_ready: bool,
    done: bool,
}

impl<I, S> Writer<I, S>
where
    I: Iterator<Item = Result<Record, BeardError>>,
    S: ImageService,
{
    pub fn with_service(
        records: impl IntoIterator<IntoIter = I, Item = Result<Record, BeardError>>,
        config: &RecordConfig,
        folder: &Path,
        options: StoreOptions,
        service: S,
    ) -> Result<Self, BeardError> {
        if options.clean && folder.exists() {
            debug!("cleaning {}", folder.display());
            fs::remove_dir_all(folder)?;
        }
        fs::create_dir_all(folder)?;

        let config = config.normalized();
        config.write_json(&folder.join(CONFIG_FILE))?;

        for split in [Split::Training, Split::Development] {
            prepare_split_dir(folder, split)?;
        }

        Ok(Self {
            records: records.into_iter(),
            config,
            root: folder.to_path_buf(),
            counter: options.start_id,
            options,
            service,
            written: 0,
            test_ready: false,
            done: false,
        })
    }

    /// Counter value the next record will get.
    pub fn next_id(&self) -> u64 {
        self.counter
    }

    fn write_record(&mut self, record: &Record) -> Result<StoredRecord, BeardError> {
        if record.split == Split::Testing && !self.test_ready {
            prepare_split_dir(&self.root, Split::Testing)?;
            self.test_ready = true;
        }

        // Encode first so a bad record leaves nothing behind.
        let label = self.encode_label(record)?;

        let split_dir = self.root.join(record.split.folder_name());
        let stem = format!("{:06}", self.counter);
        let image_path = split_dir
            .join("images")
            .join(format!("{stem}.{}", self.options.image_extension));
        let label_path = split_dir.join("labels").join(format!("{stem}.txt"));

        if let Err(err) = self.service.write(&image_path, &record.image) {
            let _ = fs::remove_file(&image_path);
            return Err(err);
        }
        if let Err(err) = fs::write(&label_path, label) {
            let _ = fs::remove_file(&image_path);
            return Err(err.into());
        }

        let stored = StoredRecord {
            id: self.counter,
            split: record.split,
            image_path,
            label_path,
        };
        self.counter += 1;
        self.written += 1;
        Ok(stored)
    }

    fn encode_label(&self, record: &Record) -> Result<String, BeardError> {
        let mut lines = Vec::with_capacity(record.objects.len() + 1);
        if !self.config.global.is_empty() {
            let encoded = encode_row(&record.global, &self.config.global)?;
            log_diagnostics(self.counter, &encoded.diagnostics);
            lines.push(encoded.line());
        }
        for object in &record.objects {
            let encoded = encode_row(object, &self.config.boxes)?;
            log_diagnostics(self.counter, &encoded.diagnostics);
            lines.push(encoded.line());
        }

        let mut label = lines.join("\n");
        label.push('\n');
        Ok(label)
    }
}

impl<I, S> Iterator for Writer<I, S>
where
    I: Iterator<Item = Result<Record, BeardError>>,
    S: ImageService,
{
    type Item = Result<StoredRecord, BeardError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.records.next() {
            Some(Ok(record)) => Some(self.write_record(&record)),
            Some(Err(err)) => Some(Err(err)),
            None => {
                if !self.done {
                    self.done = true;
                    info!("stored {} records in {}", self.written, self.root.display());
                }
                None
            }
        }
    }
}

fn prepare_split_dir(root: &Path, split: Split) -> Result<(), BeardError> {
    let dir = root.join(split.folder_name());
    fs::create_dir_all(dir.join("images"))?;
    fs::create_dir_all(dir.join("labels"))?;
    Ok(())
}

fn log_diagnostics(id: u64, diagnostics: &[crate::schema::CodecDiagnostic]) {
    for diagnostic in diagnostics {
        warn!("record {id:06}: {}: {}", diagnostic.field, diagnostic.message);
    }
}
