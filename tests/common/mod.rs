#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

pub const BEARD_CONFIG: &str = r#"{
    "global": [
        {"type": "value", "name": "complexity", "dtype": "float", "pos": 0}
    ],
    "boxes": [
        {"type": "enum", "name": "class", "dtype": "str", "values": ["Car", "Van", "Pedestrian"], "pos": 0},
        {"type": "box-array", "name": "bbox", "dtype": "int", "length": 4,
         "bb_type": "absolute", "order": "x-y", "pos": 1},
        {"type": "value", "name": "score", "dtype": "float", "optional": true, "pos": 5}
    ]
}"#;

pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .expect("write png file");
}

pub fn write_label(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write label file");
}

/// A generic dataset with one train, one dev and one test image.
pub fn create_beard_dataset(root: &Path) {
    fs::create_dir_all(root).expect("create root");
    fs::write(root.join("dataset.json"), BEARD_CONFIG).expect("write config");

    write_png(&root.join("train/images/img_b.png"), 40, 20, [10, 10, 10]);
    write_png(&root.join("train/images/img_a.png"), 40, 20, [20, 20, 20]);
    write_label(
        &root.join("train/labels/img_a.txt"),
        "0.5\nCar 2 4 10 12\nPedestrian 20 0 30 10 0.9\n",
    );
    write_label(&root.join("train/labels/img_b.txt"), "0.25\nvan 0 0 40 20\n");

    write_png(&root.join("val/img/img_c.png"), 40, 20, [30, 30, 30]);
    write_label(&root.join("val/lbl/img_c.txt"), "1\nCar 1 1 5 5\n");

    write_png(&root.join("testing/images/img_d.png"), 40, 20, [40, 40, 40]);
    write_label(&root.join("testing/labels/img_d.txt"), "0\n");
}

/// A KITTI dataset: two labelled training images and one unlabelled test image.
pub fn create_kitti_dataset(root: &Path) {
    write_png(&root.join("training/image_2/000000.png"), 124, 38, [90, 90, 90]);
    write_label(
        &root.join("training/label_2/000000.txt"),
        "Pedestrian 0.00 0 -0.20 12.40 3.00 40.73 30.92 1.89 0.48 1.20 1.84 1.47 8.41 0.01\n",
    );
    write_png(&root.join("training/image_2/000001.png"), 124, 38, [90, 90, 90]);
    write_label(
        &root.join("training/label_2/000001.txt"),
        "Car 0.00 0 1.85 38.0 1.0 100.0 37.0 1.67 1.87 3.69 -16.53 2.39 58.49 1.57\n\
         DontCare -1 -1 -10 5.0 5.0 9.0 9.0 -1 -1 -1 -1000 -1000 -1000 -10\n",
    );
    write_png(&root.join("testing/image_2/000000.png"), 124, 38, [0, 0, 0]);
}
