use crate::Pixel;
use crate::tensor::ShapeError;
use crate::tensor::Tensor;
use image::imageops::FilterType;
use rand::Rng;
use std::path::Path;

/// Per-sample extent `[height, width, channels]`.
pub type Extent = [usize; 3];

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("cannot decode images into {0} channels")]
    Channels(usize),
}

/// One image as raw `[h, w, c]` intensities in [0, 255].
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub pixels: Tensor,
}

impl Sample {
    /// Decode, convert to the requested channel count (grey, RGB or RGBA)
    /// and resize (nearest neighbour) to `[height, width]`.
    pub fn open(path: &Path, [h, w, c]: Extent) -> Result<Self, SampleError> {
        let image = image::open(path)?;
        let (x, y) = (w as u32, h as u32);
        let raw = match c {
            1 => image::imageops::resize(&image.to_luma8(), x, y, FilterType::Nearest).into_raw(),
            3 => image::imageops::resize(&image.to_rgb8(), x, y, FilterType::Nearest).into_raw(),
            4 => image::imageops::resize(&image.to_rgba8(), x, y, FilterType::Nearest).into_raw(),
            c => return Err(SampleError::Channels(c)),
        };
        let pixels = raw.into_iter().map(Pixel::from).collect();
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            pixels: Tensor::new(vec![h, w, c], pixels).expect("decoded buffer matches extent"),
        })
    }
    /// Uniform random integer intensities.
    pub fn random(name: String, [h, w, c]: Extent, rng: &mut impl Rng) -> Self {
        let pixels = (0..h * w * c)
            .map(|_| rng.random_range(0..256u16) as Pixel)
            .collect();
        Self {
            name,
            pixels: Tensor::new(vec![h, w, c], pixels).expect("random buffer matches extent"),
        }
    }
}

/// Up to `cap` images from `dir`, in file name order. Entries that fail to
/// decode still count toward the cap and are skipped with a warning.
pub fn load(dir: &Path, size: Extent, cap: usize) -> Vec<Sample> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        log::info!("no sample directory at {}", dir.display());
        return Vec::new();
    };
    let mut paths = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    paths.sort();
    paths
        .into_iter()
        .take(cap)
        .filter_map(|path| match Sample::open(&path, size) {
            Ok(sample) => {
                log::info!("loaded {}", sample.name);
                Some(sample)
            }
            Err(e) => {
                log::warn!("could not load {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

/// `count` random images named `random_<i>.png`.
pub fn synthetic(count: usize, size: Extent, rng: &mut impl Rng) -> Vec<Sample> {
    (0..count)
        .map(|i| Sample::random(format!("random_{}.png", i), size, rng))
        .collect()
}

/// Sample images, or synthetic ones when none load.
pub fn gather(dir: &Path, size: Extent, rng: &mut impl Rng) -> Vec<Sample> {
    match load(dir, size, crate::SAMPLE_CAP) {
        samples if samples.is_empty() => {
            log::warn!("no test images found; using random images");
            synthetic(crate::SYNTHETIC_COUNT, size, rng)
        }
        samples => samples,
    }
}

/// `NHWC` batch of the samples' raw pixels.
pub fn batch(samples: &[Sample]) -> Result<Tensor, ShapeError> {
    Tensor::stack(
        &samples
            .iter()
            .map(|s| s.pixels.clone())
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn empty_directory_yields_three_synthetic_images() {
        let dir = tempfile::tempdir().unwrap();
        let ref mut rng = SmallRng::seed_from_u64(0);
        let samples = gather(dir.path(), [128, 128, 3], rng);
        assert_eq!(samples.len(), crate::SYNTHETIC_COUNT);
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample.name, format!("random_{}.png", i));
            assert_eq!(sample.pixels.shape(), &[128, 128, 3]);
            assert!(sample.pixels.data().iter().all(|v| (0.0..=255.0).contains(v)));
        }
    }

    #[test]
    fn missing_directory_yields_synthetic_images() {
        let dir = tempfile::tempdir().unwrap();
        let ref mut rng = SmallRng::seed_from_u64(0);
        let samples = gather(&dir.path().join("absent"), [8, 8, 3], rng);
        assert_eq!(samples.len(), crate::SYNTHETIC_COUNT);
    }

    #[test]
    fn loads_sorted_resized_and_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::from_pixel(16, 12, image::Rgb([255, 0, 10]))
            .save(dir.path().join("b.png"))
            .unwrap();
        image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("c.txt"), "not an image").unwrap();
        let samples = load(dir.path(), [8, 6, 3], 5);
        let names = samples.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert_eq!(samples[1].pixels.shape(), &[8, 6, 3]);
        assert_eq!(&samples[1].pixels.data()[..3], &[255., 0., 10.]);
    }

    #[test]
    fn cap_counts_unreadable_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "junk").unwrap();
        image::RgbImage::new(2, 2).save(dir.path().join("b.png")).unwrap();
        assert!(load(dir.path(), [2, 2, 3], 1).is_empty());
        assert_eq!(load(dir.path(), [2, 2, 3], 2).len(), 1);
    }

    #[test]
    fn batch_stacks_samples() {
        let ref mut rng = SmallRng::seed_from_u64(1);
        let x = batch(&synthetic(3, [4, 5, 3], rng)).unwrap();
        assert_eq!(x.shape(), &[3, 4, 5, 3]);
    }

    #[test]
    fn channel_count_follows_extent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30])).save(&path).unwrap();
        let grey = Sample::open(&path, [4, 4, 1]).unwrap();
        assert_eq!(grey.pixels.shape(), &[4, 4, 1]);
        let rgba = Sample::open(&path, [2, 2, 4]).unwrap();
        assert_eq!(&rgba.pixels.data()[..4], &[10., 20., 30., 255.]);
        assert!(matches!(
            Sample::open(&path, [2, 2, 2]),
            Err(SampleError::Channels(2))
        ));
        let ref mut rng = SmallRng::seed_from_u64(2);
        assert_eq!(synthetic(1, [3, 3, 1], rng)[0].pixels.shape(), &[3, 3, 1]);
    }
}
