//! Dataset directories
//!
//! A dataset directory holds everything the backend and its checks exchange with the frontend:
//!
//! | path       | contents                                          |
//! |------------|---------------------------------------------------|
//! | `t.df`     | the encoded dataflow                              |
//! | `in`       | program inputs, by name                           |
//! | `pt`       | plaintext operands of encrypted operators, by id  |
//! | `ct_unenc` | values to encrypt, by id                          |
//! | `out_tfhe` | reference outputs, by name                        |

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::ir::error::Result;
use crate::ir::op::TensorV;
use crate::ir::shape::Shape;
use crate::target::df::Dataflow;
use crate::target::tensor_text::{export_tensors, import_tensors};

/// The files of one dataset.
#[derive(Clone, Debug)]
pub struct DataSet {
    root: PathBuf,
}

impl DataSet {
    /// The dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataSet { root: root.into() }
    }
    /// The encoded dataflow.
    pub fn tdf(&self) -> PathBuf {
        self.root.join("t.df")
    }
    /// Program inputs.
    pub fn inputs(&self) -> PathBuf {
        self.root.join("in")
    }
    /// Plaintext backend inputs.
    pub fn pt_in(&self) -> PathBuf {
        self.root.join("pt")
    }
    /// Ciphertext backend inputs, before encryption.
    pub fn ct_in(&self) -> PathBuf {
        self.root.join("ct_unenc")
    }
    /// Reference outputs.
    pub fn out_tfhe(&self) -> PathBuf {
        self.root.join("out_tfhe")
    }

    /// Write the encoded dataflow.
    pub fn write_tdf(&self, df: &Dataflow) -> Result<()> {
        info!("Generating dataflow in {}", self.tdf().display());
        fs::create_dir_all(&self.root)?;
        fs::write(self.tdf(), df.encode())?;
        Ok(())
    }

    /// Write seeded random values for every input of `df`.
    pub fn write_rand_inputs(&self, df: &Dataflow, seed: u64) -> Result<()> {
        info!("Generating random inputs in {}", self.inputs().display());
        export_tensors(self.inputs(), &rand_inputs(df.in_shapes(), seed))
    }

    /// Turn the program inputs into backend inputs.
    pub fn write_backend_inputs(&self, df: &Dataflow) -> Result<()> {
        info!(
            "Generating {} and {}",
            self.pt_in().display(),
            self.ct_in().display()
        );
        let inputs = self.read_inputs()?;
        export_tensors(self.pt_in(), &df.pt_in(&inputs)?)?;
        export_tensors(self.ct_in(), &df.ct_in(&inputs)?)
    }

    /// Compute reference outputs from the program inputs.
    pub fn write_outputs(&self, df: &Dataflow) -> Result<()> {
        info!("Generating {}", self.out_tfhe().display());
        let inputs = self.read_inputs()?;
        export_tensors(self.out_tfhe(), &df.outputs(&inputs)?)
    }

    /// Read the program inputs.
    pub fn read_inputs(&self) -> Result<BTreeMap<String, TensorV>> {
        import_tensors(self.inputs())
    }
}

impl AsRef<Path> for DataSet {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}

/// Uniform values in `[-1, 1)` for each input, drawn in name order from a seeded generator.
pub fn rand_inputs(shapes: &[(String, Shape)], seed: u64) -> BTreeMap<String, TensorV> {
    let sorted: BTreeMap<&str, &Shape> = shapes.iter().map(|(n, s)| (n.as_str(), s)).collect();
    let rng = &mut ChaChaRng::seed_from_u64(seed);
    let dist = Uniform::new(-1.0, 1.0);
    sorted
        .into_iter()
        .map(|(name, shape)| {
            let t = TensorV::from_shape_simple_fn(shape.clone(), || dist.sample(rng));
            (name.to_owned(), t)
        })
        .collect()
}
