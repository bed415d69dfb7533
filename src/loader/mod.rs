//! Lazy loading of split folders into unified [`Record`]s.
//!
//! [`load`] opens a generic dataset (config file in the root),
//! [`crate::adapter::kitti::load`] a KITTI one. Both hand back a [`Loader`],
//! an iterator that reads one image and its annotation file per pull:
//!
//! ```text
//! root/
//!   config.json
//!   train/ (or training/)
//!     images/000001.jpg
//!     labels/000001.txt      <- optional global line, then one line per object
//!   val/ dev/ ...
//! ```
//!
//! Every box-array field is normalized through the image's resize
//! [`Transform`](crate::geometry::Transform) into absolute y-x pixels of the
//! returned image.

mod report;

pub use report::{LoadCounts, LoadIssue, LoadIssueCode, LoadReport, LoadSeverity};

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::adapter::FolderLayout;
use crate::error::BeardError;
use crate::geometry::{normalize_box, resize_image, ResizeSpec, Transform};
use crate::imaging::{is_image_file, ImageCrate, ImageService};
use crate::ir::{Fields, Record, Split, Value};
use crate::schema::{
    decode_row, find_config, FieldKind, FieldSchema, RecordConfig, CLASS_FIELD, UNKNOWN,
};

/// What to do with an annotation row that fails to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowErrorPolicy {
    /// Yield the record as an error; the next pull continues with the next image.
    #[default]
    Fail,
    /// Drop the row, warn, and keep the rest of the record.
    Skip,
}

/// Options shared by every dataset entry point.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Splits to load; `None` loads all of them.
    pub only: Option<Vec<Split>>,
    pub resize: ResizeSpec,
    /// Class allowlist. Objects outside it are relabeled to its first entry.
    pub classes: Option<Vec<String>>,
    pub on_row_error: RowErrorPolicy,
    pub layout: FolderLayout,
    /// Seed for random pad fill.
    pub seed: Option<u64>,
}

impl LoadOptions {
    pub fn only(mut self, splits: impl IntoIterator<Item = Split>) -> Self {
        self.only = Some(splits.into_iter().collect());
        self
    }

    pub fn with_resize(mut self, resize: ResizeSpec) -> Self {
        self.resize = resize;
        self
    }

    pub fn with_classes(mut self, classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_row_error_policy(mut self, policy: RowErrorPolicy) -> Self {
        self.on_row_error = policy;
        self
    }

    fn wants(&self, split: Split) -> bool {
        self.only
            .as_ref()
            .map(|only| only.contains(&split))
            .unwrap_or(true)
    }
}

/// Opens a generic dataset rooted at `folder`.
///
/// `config_name` selects the config file (exact name or `*` pattern); the
/// default takes the first `*.json`, then `*.yaml`/`*.yml`. The returned
/// config carries the class allowlist, if one was given.
pub fn load(
    folder: &Path,
    config_name: Option<&str>,
    options: LoadOptions,
) -> Result<(RecordConfig, Loader), BeardError> {
    if !folder.is_dir() {
        return Err(BeardError::MissingPath {
            path: folder.to_path_buf(),
        });
    }

    let config_path = find_config(folder, config_name)?;
    debug!("using dataset config {}", config_path.display());
    let mut config = RecordConfig::from_path(&config_path)?;
    if let Some(classes) = &options.classes {
        config = config.with_class_values(classes);
    }

    let loader = Loader::new(folder, config.clone(), options)?;
    Ok((config, loader))
}

struct FolderCursor {
    split: Split,
    images: std::vec::IntoIter<PathBuf>,
    label_dir: Option<PathBuf>,
}

/// Pull-based record source over the split folders of one dataset.
///
/// Splits are visited in canonical order. Within a split every existing
/// folder alias is drained fully before the next one is opened.
pub struct Loader<S: ImageService = ImageCrate> {
    root: PathBuf,
    config: RecordConfig,
    options: LoadOptions,
    service: S,
    rng: StdRng,
    splits: VecDeque<Split>,
    folders: VecDeque<(Split, PathBuf)>,
    cursor: Option<FolderCursor>,
    report: LoadReport,
    done: bool,
}

impl<S: ImageService> fmt::Debug for Loader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("root", &self.root)
            .field("pending_splits", &self.splits)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Loader<ImageCrate> {
    pub fn new(root: &Path, config: RecordConfig, options: LoadOptions) -> Result<Self, BeardError> {
        Self::with_service(root, config, options, ImageCrate)
    }
}

impl<S: ImageService> Loader<S> {
    /// Creates a loader reading pixels through `service`.
    pub fn with_service(
        root: &Path,
        config: RecordConfig,
        options: LoadOptions,
        service: S,
    ) -> Result<Self, BeardError> {
        if !root.is_dir() {
            return Err(BeardError::MissingPath {
                path: root.to_path_buf(),
            });
        }

        let seed = options.seed.unwrap_or_else(|| rand::rng().random());
        let splits = Split::ALL
            .into_iter()
            .filter(|split| options.wants(*split))
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            config,
            options,
            service,
            rng: StdRng::seed_from_u64(seed),
            splits,
            folders: VecDeque::new(),
            cursor: None,
            report: LoadReport::new(),
            done: false,
        })
    }

    /// The schema records are decoded with.
    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// What has been loaded so far.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Queues every existing alias folder of `split`.
    fn open_split(&mut self, split: Split) {
        let found: Vec<PathBuf> = split
            .aliases()
            .iter()
            .map(|alias| self.root.join(alias))
            .filter(|dir| dir.is_dir())
            .collect();

        if found.is_empty() {
            warn!("could not find a folder for split {split}");
            self.report.add(LoadIssue::info(
                LoadIssueCode::MissingSplitFolder,
                format!("no folder for {split} in {}", self.root.display()),
            ));
            return;
        }

        self.folders
            .extend(found.into_iter().map(|dir| (split, dir)));
    }

    fn open_folder(&mut self, split: Split, dir: &Path) -> Result<FolderCursor, BeardError> {
        let layout = &self.options.layout;
        let Some(image_dir) = layout.image_dir(dir) else {
            warn!("split folder {} has no image folder", dir.display());
            return Ok(FolderCursor {
                split,
                images: Vec::new().into_iter(),
                label_dir: None,
            });
        };
        let label_dir = layout.label_dir(dir);
        if label_dir.is_none() {
            debug!("split folder {} has no label folder", dir.display());
        }

        let mut images = Vec::new();
        for entry in WalkDir::new(&image_dir)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| BeardError::Io(err.into()))?;
            if entry.file_type().is_file() && is_image_file(entry.path()) {
                images.push(entry.into_path());
            }
        }
        debug!("{split}: {} images in {}", images.len(), image_dir.display());

        Ok(FolderCursor {
            split,
            images: images.into_iter(),
            label_dir,
        })
    }

    fn load_record(
        &mut self,
        split: Split,
        image_path: &Path,
        label_dir: Option<&Path>,
    ) -> Result<Record, BeardError> {
        let image = self.service.read(image_path)?;
        let source = (image.height(), image.width());
        let (image, transform) =
            resize_image(&image, &self.options.resize, &self.service, &mut self.rng)?;

        let label_path = label_dir
            .and_then(|dir| self.options.layout.label_path(dir, image_path))
            .filter(|path| path.is_file());

        let (global, objects) = match label_path {
            Some(path) => {
                let ctx = RowContext {
                    path: &path,
                    source,
                    transform: &transform,
                    classes: self.options.classes.as_deref(),
                    policy: self.options.on_row_error,
                    split,
                };
                read_labels(&self.config, &ctx, &mut self.report)?
            }
            None => {
                debug!("no annotation file for {}", image_path.display());
                self.report.add(LoadIssue::info(
                    LoadIssueCode::MissingLabelFile,
                    format!("{} has no annotation file", image_path.display()),
                ));
                (Fields::new(), Vec::new())
            }
        };

        let counts = self.report.counts_mut(split);
        counts.records += 1;
        counts.objects += objects.len();

        Ok(Record::new(image, split)
            .with_global(global)
            .with_objects(objects))
    }
}

impl<S: ImageService> Iterator for Loader<S> {
    type Item = Result<Record, BeardError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.cursor.as_mut().and_then(|cursor| {
                cursor
                    .images
                    .next()
                    .map(|path| (cursor.split, path, cursor.label_dir.clone()))
            });
            if let Some((split, image_path, label_dir)) = next {
                let result = self.load_record(split, &image_path, label_dir.as_deref());
                if let Err(err) = &result {
                    self.report.add(LoadIssue::warning(
                        LoadIssueCode::FailedRecord,
                        format!("{}: {err}", image_path.display()),
                    ));
                }
                return Some(result);
            }
            self.cursor = None;

            if let Some((split, dir)) = self.folders.pop_front() {
                match self.open_folder(split, &dir) {
                    Ok(cursor) => self.cursor = Some(cursor),
                    Err(err) => return Some(Err(err)),
                }
                continue;
            }

            if let Some(split) = self.splits.pop_front() {
                self.open_split(split);
                continue;
            }

            if !self.done {
                self.done = true;
                info!(
                    "loaded {} records with {} objects from {}",
                    self.report.records(),
                    self.report.objects(),
                    self.root.display()
                );
            }
            return None;
        }
    }
}

/// Per-file decoding context.
struct RowContext<'a> {
    path: &'a Path,
    source: (u32, u32),
    transform: &'a Transform,
    classes: Option<&'a [String]>,
    policy: RowErrorPolicy,
    split: Split,
}

fn read_labels(
    config: &RecordConfig,
    ctx: &RowContext<'_>,
    report: &mut LoadReport,
) -> Result<(Fields, Vec<Fields>), BeardError> {
    let text = fs::read_to_string(ctx.path)?;
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

    // The global line is positional: a blank first line is a global row
    // whose optional fields are all null.
    let mut global = Fields::new();
    if !config.global.is_empty() {
        if let Some((line_no, line)) = lines.next() {
            match decode_line(&config.global, line, line_no, ctx, report) {
                Ok(fields) => global = fields,
                Err(err) => skip_or_fail(err, ctx, report)?,
            }
        }
    }

    let mut objects = Vec::new();
    for (line_no, line) in lines.filter(|(_, line)| !line.trim().is_empty()) {
        match decode_line(&config.boxes, line, line_no, ctx, report) {
            Ok(mut fields) => {
                restrict_class(&mut fields, ctx, report);
                objects.push(fields);
            }
            Err(err) => skip_or_fail(err, ctx, report)?,
        }
    }

    Ok((global, objects))
}

fn skip_or_fail(
    err: BeardError,
    ctx: &RowContext<'_>,
    report: &mut LoadReport,
) -> Result<(), BeardError> {
    match ctx.policy {
        RowErrorPolicy::Fail => Err(err),
        RowErrorPolicy::Skip => {
            warn!("skipping row: {err}");
            report.counts_mut(ctx.split).skipped_rows += 1;
            report.add(LoadIssue::warning(LoadIssueCode::SkippedRow, err.to_string()));
            Ok(())
        }
    }
}

/// Decodes one line and normalizes its box-arrays.
fn decode_line(
    schema: &[FieldSchema],
    line: &str,
    line_no: usize,
    ctx: &RowContext<'_>,
    report: &mut LoadReport,
) -> Result<Fields, BeardError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let decoded =
        decode_row(&tokens, schema).map_err(|err| BeardError::format_at(ctx.path, line_no, err))?;

    if !decoded.remaining.is_empty() {
        debug!(
            "{}:{line_no}: ignoring {} trailing tokens",
            ctx.path.display(),
            decoded.remaining.len()
        );
    }

    for diagnostic in &decoded.diagnostics {
        // Covered by the class substitution below.
        if ctx.classes.is_some() && diagnostic.field == CLASS_FIELD {
            continue;
        }
        warn!(
            "{}:{line_no}: {}: {}",
            ctx.path.display(),
            diagnostic.field,
            diagnostic.message
        );
        report.add(LoadIssue::warning(
            LoadIssueCode::EnumOutOfRange,
            format!("{}:{line_no}: {}", ctx.path.display(), diagnostic.message),
        ));
    }

    let mut fields = decoded.fields;
    for field in schema {
        let FieldKind::BoxArray { order, reference } = field.kind else {
            continue;
        };
        let Some(Value::Array(items)) = fields.get(&field.name) else {
            continue;
        };
        let raw = items
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<f64>>>()
            .and_then(|values| <[f64; 4]>::try_from(values).ok())
            .ok_or_else(|| {
                BeardError::format_at(
                    ctx.path,
                    line_no,
                    BeardError::format(format!("box '{}' is not numeric", field.name)),
                )
            })?;
        let bbox = normalize_box(raw, order, reference, ctx.source, ctx.transform);
        fields.insert(field.name.clone(), Value::Box(bbox));
    }

    Ok(fields)
}

/// Relabels a `class` outside the allowlist to the list's first entry.
fn restrict_class(fields: &mut Fields, ctx: &RowContext<'_>, report: &mut LoadReport) {
    let Some(classes) = ctx.classes else {
        return;
    };
    let Some(first) = classes.first() else {
        return;
    };
    let Some(value) = fields.get_mut(CLASS_FIELD) else {
        return;
    };

    let allowed = match &*value {
        Value::Str(name) => {
            name != UNKNOWN && classes.iter().any(|c| c.eq_ignore_ascii_case(name))
        }
        Value::Int(index) => *index >= 0 && (*index as usize) < classes.len(),
        _ => true,
    };
    if allowed {
        return;
    }

    warn!(
        "{}: class {value} is not in the class list, using {first}",
        ctx.path.display()
    );
    report.add(LoadIssue::warning(
        LoadIssueCode::ClassSubstituted,
        format!("{}: class {value} replaced by {first}", ctx.path.display()),
    ));
    let replacement = if matches!(value, Value::Int(_)) {
        Value::Int(0)
    } else {
        Value::Str(first.clone())
    };
    *value = replacement;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TargetSize;
    use crate::ir::BBox;
    use image::{Rgb, RgbImage};

    const CONFIG: &str = r#"{
        "global": [{"type": "value", "name": "complexity", "dtype": "float"}],
        "boxes": [
            {"type": "enum", "name": "class", "dtype": "str", "values": ["Car", "Van", "Tram"]},
            {"type": "box-array", "name": "bbox", "dtype": "int", "length": 4,
             "bb_type": "absolute", "order": "x-y"}
        ]
    }"#;

    fn write_sample(root: &Path, split_dir: &str, stem: &str, label: Option<&str>) {
        let images = root.join(split_dir).join("images");
        let labels = root.join(split_dir).join("labels");
        fs::create_dir_all(&images).expect("mkdir images");
        fs::create_dir_all(&labels).expect("mkdir labels");
        RgbImage::from_pixel(200, 100, Rgb([50, 60, 70]))
            .save(images.join(format!("{stem}.png")))
            .expect("save png");
        if let Some(label) = label {
            fs::write(labels.join(format!("{stem}.txt")), label).expect("write label");
        }
    }

    fn dataset() -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("config.json"), CONFIG).expect("write config");
        temp
    }

    #[test]
    fn loads_global_and_objects() {
        let temp = dataset();
        write_sample(temp.path(), "train", "a", Some("0.5\nCar 10 20 30 40\nvan 0 0 5 5\n"));

        let (_, loader) = load(temp.path(), None, LoadOptions::default()).expect("open");
        let records: Vec<Record> = loader.collect::<Result<_, _>>().expect("records");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.split, Split::Training);
        assert_eq!(record.global["complexity"], Value::Float(0.5));
        assert_eq!(record.objects.len(), 2);
        assert_eq!(record.objects[1]["class"], Value::from("Van"));
        assert_eq!(
            record.objects[0]["bbox"],
            Value::Box(BBox::from_yxyx(20.0, 10.0, 40.0, 30.0))
        );
    }

    #[test]
    fn resize_is_applied_to_boxes() {
        let temp = dataset();
        write_sample(temp.path(), "train", "a", Some("0\nCar 40 20 80 60\n"));

        let options = LoadOptions::default().with_resize(ResizeSpec::new(TargetSize::Exact {
            height: 50,
            width: 50,
        }));
        let (_, loader) = load(temp.path(), None, options).expect("open");
        let record = loader.into_iter().next().expect("one").expect("ok");

        assert_eq!(record.size(), (50, 50));
        assert_eq!(
            record.objects[0]["bbox"],
            Value::Box(BBox::from_yxyx(5.0, 10.0, 15.0, 20.0))
        );
    }

    #[test]
    fn aliases_of_one_split_are_drained_in_order() {
        let temp = dataset();
        write_sample(temp.path(), "training", "b", Some("0\n"));
        write_sample(temp.path(), "train", "a", Some("0\n"));
        write_sample(temp.path(), "valid", "c", Some("0\n"));

        let (_, loader) = load(temp.path(), None, LoadOptions::default()).expect("open");
        let splits: Vec<Split> = loader.map(|r| r.expect("record").split).collect();
        assert_eq!(splits, vec![Split::Training, Split::Training, Split::Development]);
    }

    #[test]
    fn only_restricts_splits() {
        let temp = dataset();
        write_sample(temp.path(), "train", "a", Some("0\n"));
        write_sample(temp.path(), "dev", "b", Some("0\n"));
        write_sample(temp.path(), "test", "c", Some("0\n"));

        let options = LoadOptions::default().only([Split::Training]);
        let (_, loader) = load(temp.path(), None, options).expect("open");
        let records: Vec<Record> = loader.collect::<Result<_, _>>().expect("records");
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.split == Split::Training));
    }

    #[test]
    fn missing_split_is_reported_not_fatal() {
        let temp = dataset();
        write_sample(temp.path(), "train", "a", Some("0\n"));

        let (_, mut loader) = load(temp.path(), None, LoadOptions::default()).expect("open");
        assert_eq!(loader.by_ref().count(), 1);
        let report = loader.report();
        assert_eq!(report.issues_with(LoadIssueCode::MissingSplitFolder).count(), 2);
        assert_eq!(report.records(), 1);
    }

    #[test]
    fn missing_label_file_yields_empty_record() {
        let temp = dataset();
        write_sample(temp.path(), "test", "a", None);

        let (_, loader) = load(temp.path(), None, LoadOptions::default()).expect("open");
        let record = loader.into_iter().next().expect("one").expect("ok");
        assert!(record.global.is_empty());
        assert!(record.objects.is_empty());
    }

    #[test]
    fn class_allowlist_substitutes_first_class() {
        let temp = dataset();
        write_sample(temp.path(), "train", "a", Some("0\nTram 0 0 5 5\nZebra 0 0 5 5\nvan 0 0 5 5\n"));

        let options = LoadOptions::default().with_classes(["Car", "Van"]);
        let (config, mut loader) = load(temp.path(), None, options).expect("open");
        let record = loader.next().expect("one").expect("ok");

        let classes: Vec<&Value> = record.objects.iter().map(|o| &o["class"]).collect();
        assert_eq!(
            classes,
            vec![&Value::from("Car"), &Value::from("Car"), &Value::from("Van")]
        );
        assert_eq!(
            loader.report().issues_with(LoadIssueCode::ClassSubstituted).count(),
            2
        );
        assert!(matches!(
            &config.class_field().expect("class").kind,
            FieldKind::Enum { values } if values.len() == 2
        ));
    }

    #[test]
    fn row_errors_follow_policy() {
        let temp = dataset();
        write_sample(temp.path(), "train", "a", Some("0\nCar 1 2 x 4\nCar 1 2 3 4\n"));
        write_sample(temp.path(), "train", "b", Some("0\nCar 1 2 3 4\n"));

        let (_, loader) = load(temp.path(), None, LoadOptions::default()).expect("open");
        let results: Vec<Result<Record, BeardError>> = loader.collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(
            &results[0],
            Err(BeardError::Format { line: 2, .. })
        ));
        assert!(results[1].is_ok());

        let options = LoadOptions::default().with_row_error_policy(RowErrorPolicy::Skip);
        let (_, mut loader) = load(temp.path(), None, options).expect("open");
        let first = loader.next().expect("one").expect("skip keeps record");
        assert_eq!(first.objects.len(), 1);
        assert_eq!(loader.report().splits[&Split::Training].skipped_rows, 1);
    }

    #[test]
    fn missing_root_is_fatal() {
        let err = load(Path::new("/nonexistent/beard"), None, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, BeardError::MissingPath { .. }));
    }

    #[test]
    fn missing_config_is_fatal() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = load(temp.path(), None, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, BeardError::ConfigNotFound { .. }));
    }
}
