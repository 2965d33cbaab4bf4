use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use rand::prelude::*;
use rand_pcg::Pcg64;
use std::path::Path;

use fast_radon::bridge::radon_from_sinogram;
use fast_radon::fast_radon::{inverse, reconstruct, scan, Radon};
use fast_radon::refine::{reconstruct_expanded, scan_expanded};
use fast_radon::stitch::stitch;
use fast_radon::tomo_image::Image;
use fast_radon::tomo_scan::{self, Sinogram};

////////////////////////////////////////////////////////////////////////
// Main entry point
//

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Algorithm {
    /// Fast scan, ramp filter, fast back-projection.
    Fast,
    /// Fast scan then exact inverse. No filtering.
    Exact,
    /// Fast scan and back-projection at a higher slope resolution.
    Expanded,
    /// Conventional scan, resampled onto the fast layout.
    Bridged,
    /// Conventional scan and back-projection throughout.
    Naive,
}

/// Scan an image and reconstruct it with the fast discrete Radon transform.
#[derive(Parser)]
#[clap(version, about)]
struct Opts {
    /// Input image file, which will be scanned. Must be square, with a
    /// power-of-two side, except for --algorithm=naive.
    #[clap(long)]
    input_image: String,
    /// Process the red, green and blue channels separately rather than
    /// converting to grey.
    #[clap(long)]
    colour: bool,
    #[clap(value_enum, long, default_value = "fast")]
    algorithm: Algorithm,
    /// Expansion factor for --algorithm=expanded. Must be a power of two.
    #[clap(long)]
    expansion: Option<usize>,
    /// How much uniform noise to add to the scan, as fraction of maximum scan value.
    #[clap(long)]
    noise: Option<f64>,
    /// Seed for the random noise (for reproducibility)
    #[clap(long)]
    seed: Option<u64>,
    /// File to write the intermediate scan to.
    #[clap(long)]
    output_scan: Option<String>,
    /// File to write the reconstructed image to.
    #[clap(long)]
    output_image: Option<String>,
    /// Where to write the diff between input and reconstructed image to.
    #[clap(long)]
    diff_image: Option<String>,
}

const DEFAULT_EXPANSION: usize = 2;

// Either kind of scan, so noise and saving can be applied uniformly.
enum Scanned {
    Fast(Radon),
    Conventional(Sinogram),
}

impl Scanned {
    fn add_noise(self, rng: &mut Pcg64, noise: f64) -> Scanned {
        match self {
            Scanned::Fast(radon) => Scanned::Fast(radon.add_noise(rng, noise)),
            Scanned::Conventional(sinogram) => Scanned::Conventional(sinogram.add_noise(rng, noise)),
        }
    }

    fn to_image(&self) -> Image {
        match self {
            Scanned::Fast(radon) => stitch(radon),
            Scanned::Conventional(sinogram) => sinogram.to_image(),
        }
    }
}

fn check_opts(opts: &Opts) -> Result<()> {
    if let Algorithm::Expanded = opts.algorithm {
        let factor = opts.expansion.unwrap_or(DEFAULT_EXPANSION);
        ensure!(
            factor.is_power_of_two(),
            "--expansion must be a power of two"
        );
    } else {
        ensure!(
            opts.expansion.is_none(),
            "--expansion can only be used with --algorithm=expanded"
        );
    }

    if opts.noise.is_none() {
        ensure!(opts.seed.is_none(), "--seed can only be used with --noise");
    }
    if let Some(noise) = opts.noise {
        ensure!(noise >= 0.0, "--noise must not be negative");
    }
    Ok(())
}

fn generate_scan(opts: &Opts, image: &Image) -> Result<Scanned> {
    Ok(match opts.algorithm {
        Algorithm::Fast | Algorithm::Exact => Scanned::Fast(scan(image)?),
        Algorithm::Expanded => {
            let factor = opts.expansion.unwrap_or_else(|| {
                info!("--expansion not specified, using {}.", DEFAULT_EXPANSION);
                DEFAULT_EXPANSION
            });
            Scanned::Fast(scan_expanded(image, factor)?)
        }
        Algorithm::Bridged => {
            // The fast layout needs a square, power-of-two image.
            image.square_size()?;
            Scanned::Conventional(tomo_scan::scan(image, None, None)?)
        }
        Algorithm::Naive => Scanned::Conventional(tomo_scan::scan(image, None, None)?),
    })
}

fn add_noise(scanned: Scanned, opts: &Opts) -> Scanned {
    const DEFAULT_SEED: u64 = 42;

    match opts.noise {
        Some(noise) => {
            let seed = opts.seed.unwrap_or(DEFAULT_SEED);
            let mut rng = Pcg64::seed_from_u64(seed);
            scanned.add_noise(&mut rng, noise)
        }
        None => scanned,
    }
}

fn generate_reconstruction(opts: &Opts, original: &Image, scanned: &Scanned) -> Result<Image> {
    Ok(match (opts.algorithm, scanned) {
        (Algorithm::Fast, Scanned::Fast(radon)) => reconstruct(radon)?,
        (Algorithm::Exact, Scanned::Fast(radon)) => inverse(radon)?,
        (Algorithm::Expanded, Scanned::Fast(radon)) => {
            reconstruct_expanded(radon, opts.expansion.unwrap_or(DEFAULT_EXPANSION))?
        }
        (Algorithm::Bridged, Scanned::Conventional(sinogram)) => {
            reconstruct(&radon_from_sinogram(sinogram, Some(original.width))?)?
        }
        (Algorithm::Naive, Scanned::Conventional(sinogram)) => {
            tomo_scan::reconstruct(sinogram, Some(original.height), Some(original.width))
        }
        _ => unreachable!("scan kind always matches the algorithm"),
    })
}

fn report_error(base_image: &Image, new_image: &Image) {
    println!("RMS of per-pixel error: {}", base_image.rms_diff(new_image));
    println!("Correlation with input: {}", base_image.correlation(new_image));
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts: Opts = Opts::parse();
    check_opts(&opts)?;

    let path = Path::new(&opts.input_image);
    let input_image = if opts.colour {
        Image::load_rgb(path)?
    } else {
        Image::load(path)?
    };

    info!("Scanning {}x{} image...", input_image.width, input_image.height);
    let scanned = add_noise(generate_scan(&opts, &input_image)?, &opts);

    info!("Reconstructing...");
    let reconstruction = generate_reconstruction(&opts, &input_image, &scanned)?;
    info!("done!");

    report_error(&input_image, &reconstruction);

    if let Some(name) = &opts.output_scan {
        scanned
            .to_image()
            .stretch_to_u8_range()
            .save(Path::new(name))
            .context("saving scan")?;
    }

    if let Some(name) = &opts.output_image {
        reconstruction.save(Path::new(name)).context("saving reconstruction")?;
    }

    if let Some(name) = &opts.diff_image {
        // Technically, the potential range of diff-then-offset_values
        // is -127..383, but almost all diffs will be in 0..255, and
        // "save" will apply a u8 cap/floor anyway, so we don't bother
        // to scale.
        input_image
            .diff(&reconstruction)
            .offset_values(128.0)
            .save(Path::new(name))
            .context("saving diff")?;
    }

    Ok(())
}
