use std::path::PathBuf;

use log::info;

use tdf::cfg::{
    clap::{self, Parser, ValueEnum},
    TdfOpt,
};
use tdf::front::{public_in, tensor, OpTensor, Vector};
use tdf::kernels::{avg_pool2d, conv2d, mul_mv};
use tdf::target::dataset::DataSet;
use tdf::target::df::Dataflow;

#[derive(Debug, Parser)]
#[command(name = "tdfc", about = "Lowers built-in tensor programs to an HE dataflow")]
struct Options {
    #[arg(long, value_enum)]
    /// The program
    app: App,
    #[arg(long, value_enum)]
    /// What to produce
    action: Action,
    #[arg(long, default_value = ".")]
    /// The dataset directory
    root: PathBuf,
    #[arg(long, default_value = "0")]
    /// Seed for `rand-in`
    seed: u64,
    #[arg(long, default_value = "4")]
    /// Matrix rows (mul-mv) or output channels (conv2d)
    rows: usize,
    #[arg(long, default_value = "4")]
    /// Matrix columns (mul-mv) or input channels (conv2d, avg-pool)
    cols: usize,
    #[arg(long, default_value = "8")]
    /// Image height and width
    size: usize,
    #[arg(long, default_value = "3")]
    /// Filter or window size
    kernel: usize,
    #[arg(long, default_value = "1")]
    stride: usize,
    #[command(flatten)]
    tdf: TdfOpt,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, ValueEnum)]
enum App {
    /// `matrix` (public) times `vector` (encrypted)
    MulMv,
    /// `image` (encrypted) convolved with `weights` (public)
    Conv2d,
    /// average pooling of `image` (encrypted)
    AvgPool,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, ValueEnum)]
enum Action {
    /// Write the encoded dataflow
    Tdf,
    /// Print the number of useful scalar operations
    UsefulOps,
    /// Write random inputs
    RandIn,
    /// Write the backend's inputs
    BackendIn,
    /// Write reference outputs
    OutTfhe,
    /// Print input and output shapes as JSON
    Manifest,
}

fn build(opts: &Options) -> tdf::Result<Dataflow> {
    let (c, h) = (opts.cols, opts.size);
    let out = match opts.app {
        App::MulMv => {
            let matrix = OpTensor::lift(&public_in("matrix", &[opts.rows, opts.cols])?)?;
            let vector = tensor("vector", &[opts.cols])?;
            mul_mv(&matrix, &vector)?
        }
        App::Conv2d => {
            let image = tensor("image", &[c, h, h])?;
            let weights = public_in("weights", &[opts.rows, c, opts.kernel, opts.kernel])?;
            conv2d(&image, &weights, opts.stride)?
        }
        App::AvgPool => {
            let image = tensor("image", &[c, h, h])?;
            avg_pool2d(&image, opts.kernel, opts.stride)?
        }
    };
    Dataflow::single(&out)
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_timestamp(None)
        .init();
    let opts = Options::parse();
    tdf::cfg::set(&opts.tdf);

    info!("Building {:?}", opts.app);
    let df = build(&opts).unwrap();
    let ds = DataSet::new(&opts.root);
    match opts.action {
        Action::Tdf => ds.write_tdf(&df).unwrap(),
        Action::UsefulOps => println!("{}", df.useful_ops()),
        Action::RandIn => ds.write_rand_inputs(&df, opts.seed).unwrap(),
        Action::BackendIn => ds.write_backend_inputs(&df).unwrap(),
        Action::OutTfhe => ds.write_outputs(&df).unwrap(),
        Action::Manifest => println!("{}", serde_json::to_string_pretty(&df.manifest()).unwrap()),
    }
    info!("Done: {:?}", opts.action);
}
