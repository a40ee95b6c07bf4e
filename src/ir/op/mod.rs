//! Operator nodes
//!
//! An [Op] is an immutable node of the dataflow DAG. Every node records its parents, its static
//! shape, and its [Secrecy]. Construction ([Op::new]) validates the operator's parameters and
//! computes the shape, so a malformed node cannot exist.
//!
//! Nodes are compared by identity: two structurally identical nodes built separately are
//! distinct.
//!
//! ## Secrecy propagation
//!
//! A node is as confidential as the most confidential of its parents (and of its own declared
//! secrecy, for inputs and encryptions). If any parent is Encrypted, every Secret parent is
//! first replaced by its encryption ([Op::encrypted]), so an encrypted node never mixes
//! Secret and Encrypted operands.

use std::cell::RefCell;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use super::error::{Error, Result};
use super::secrecy::Secrecy;
use super::shape::{
    broadcast_shapes, broadcasts_to, is_permutation, is_pow_of_2, is_valid_name, normalize_dim,
    normalize_insert_dim, numel, shape_with_dim, strided_size, Shape,
};

pub mod eval;
pub mod index;

use index::{indexed_shape, Index, IndexFmt};

/// A dense host tensor.
pub type TensorV = ndarray::ArrayD<f64>;

/// An elementwise host function over broadcast operands.
#[derive(Clone)]
pub struct UFunc {
    name: String,
    f: Rc<dyn Fn(&[f64]) -> f64>,
}

impl UFunc {
    /// A named elementwise function; `f` receives one value per operand.
    pub fn new(name: impl Into<String>, f: impl Fn(&[f64]) -> f64 + 'static) -> Self {
        UFunc {
            name: name.into(),
            f: Rc::new(f),
        }
    }
    /// `a / b`
    pub fn divide() -> Self {
        Self::new("divide", |a| a[0] / a[1])
    }
    /// `a ^ b`
    pub fn pow() -> Self {
        Self::new("pow", |a| a[0].powf(a[1]))
    }
    /// `sqrt(a)`
    pub fn sqrt() -> Self {
        Self::new("sqrt", |a| a[0].sqrt())
    }
    /// The function's name.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Apply the function to one element from each operand.
    pub fn call(&self, args: &[f64]) -> f64 {
        (self.f)(args)
    }
}

impl Debug for UFunc {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "UFunc({})", self.name)
    }
}

/// A host-side module (e.g., a trained layer) applied to an unencrypted value.
///
/// Each declared parameter becomes a Public input of the graph, named `<prefix>.<param>`.
pub trait HostModule {
    /// Name used in diagnostics.
    fn name(&self) -> &str;
    /// Parameter names and shapes, in the order `forward` receives them.
    fn params(&self) -> Vec<(String, Shape)>;
    /// The output shape for an input of shape `input`.
    fn output_shape(&self, input: &[usize]) -> Result<Shape>;
    /// Compute the output from the input and the parameter values.
    fn forward(&self, input: &TensorV, params: &[&TensorV]) -> Result<TensorV>;
}

impl Debug for dyn HostModule {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Module({})", self.name())
    }
}

/// The operator of a node, with its parameters.
///
/// Dimension parameters may be negative when passed to [Op::new]; the node stores them
/// normalized.
#[derive(Clone, Debug)]
pub enum OpKind {
    /// A named program input (no parents)
    Input {
        /// input name
        name: String,
        /// declared shape
        shape: Shape,
        /// Secret if true, otherwise Public
        secret: bool,
    },
    /// An embedded host tensor (no parents)
    Const(Rc<TensorV>),
    /// Encrypt a Secret value
    Encrypt,
    /// A named Encrypted program result
    Output {
        /// output name
        name: String,
    },
    /// Elementwise sum
    Add,
    /// Elementwise product
    Mul,
    /// Ciphertext refresh marker
    Bootstrap,
    /// Packing normalization marker
    ChetRepack,
    /// Cyclic shift along `dim`
    Rotate {
        /// dimension
        dim: isize,
        /// amount
        by: isize,
    },
    /// Non-cyclic shift along `dim`; the wrapped region is undefined
    UnpaddedShift {
        /// dimension
        dim: isize,
        /// amount
        by: isize,
    },
    /// Cyclic shift of a whole vector
    VectorRotate {
        /// amount
        by: isize,
    },
    /// Permute the trailing dimensions
    ReorderDim {
        /// new order of the trailing dimensions
        order: Vec<isize>,
    },
    /// Keep every `by`-th element along `dim`
    Stride {
        /// dimension
        dim: isize,
        /// power-of-two step
        by: usize,
    },
    /// Truncate `dim` to `size`
    Shrink {
        /// dimension
        dim: isize,
        /// new size
        size: usize,
    },
    /// Zero-pad `dim` to `size`
    Extend {
        /// dimension
        dim: isize,
        /// new size
        size: usize,
    },
    /// Sum along `dim`, keeping it with size 1
    Sum {
        /// dimension
        dim: isize,
    },
    /// Copy a size-1 `dim` `n` times
    Replicate {
        /// dimension
        dim: isize,
        /// copies
        n: usize,
    },
    /// Remove a size-1 `dim`
    DropDim {
        /// dimension
        dim: isize,
    },
    /// Insert a size-1 dimension at `dim`
    InsertDim {
        /// dimension
        dim: isize,
    },
    /// Reinterpret the elements with a new shape
    Reshape {
        /// target shape
        shape: Shape,
    },
    /// Broadcast to a larger shape
    Broadcast {
        /// target shape
        shape: Shape,
    },
    /// Select a sub-array
    GetItem {
        /// the selection
        index: Index,
    },
    /// Overwrite a sub-array of the first parent with the second
    SetItem {
        /// the selection
        index: Index,
    },
    /// Elementwise host function over broadcast parents
    UFunc(UFunc),
    /// Collapse to one dimension
    Flatten,
    /// Host module application; parameters follow the input among the parents
    Module {
        /// the module
        module: Rc<dyn HostModule>,
        /// parameter-name prefix
        prefix: String,
    },
}

impl OpKind {
    /// Can the backend perform this operator on ciphertexts?
    pub fn is_enc_op(&self) -> bool {
        matches!(
            self,
            OpKind::Encrypt
                | OpKind::Output { .. }
                | OpKind::Add
                | OpKind::Mul
                | OpKind::Bootstrap
                | OpKind::ChetRepack
                | OpKind::Rotate { .. }
                | OpKind::UnpaddedShift { .. }
                | OpKind::VectorRotate { .. }
                | OpKind::ReorderDim { .. }
                | OpKind::Stride { .. }
                | OpKind::Shrink { .. }
                | OpKind::Extend { .. }
                | OpKind::Sum { .. }
                | OpKind::Replicate { .. }
                | OpKind::DropDim { .. }
                | OpKind::InsertDim { .. }
        )
    }

    /// Is this operator restricted to unencrypted operands?
    pub fn is_input_op(&self) -> bool {
        matches!(
            self,
            OpKind::Reshape { .. }
                | OpKind::Broadcast { .. }
                | OpKind::GetItem { .. }
                | OpKind::SetItem { .. }
                | OpKind::UFunc(_)
                | OpKind::Flatten
                | OpKind::Module { .. }
        )
    }

    /// The operator name; for encrypted operators, the backend opcode.
    ///
    /// Binary operators report their base name here; see [Op::name] for the suffixed opcode.
    pub fn opcode(&self) -> String {
        match self {
            OpKind::Input { .. } => "Input".into(),
            OpKind::Const(_) => "Const".into(),
            OpKind::Encrypt => "InputC".into(),
            OpKind::Output { .. } => "OutputC".into(),
            OpKind::Add => "Add".into(),
            OpKind::Mul => "Mul".into(),
            OpKind::Bootstrap => "BootstrapC".into(),
            OpKind::ChetRepack => "ChetRepackC".into(),
            OpKind::Rotate { .. } => "RotateC".into(),
            OpKind::UnpaddedShift { .. } => "UnpaddedShiftC".into(),
            OpKind::VectorRotate { .. } => "HackRotateC".into(),
            OpKind::ReorderDim { .. } => "ReorderDimC".into(),
            OpKind::Stride { .. } => "StrideDimC".into(),
            OpKind::Shrink { .. } | OpKind::Extend { .. } => "ResizeDimC".into(),
            OpKind::Sum { .. } => "ReduceDimC".into(),
            OpKind::Replicate { .. } => "ReplicateDimC".into(),
            OpKind::DropDim { .. } => "DropDimC".into(),
            OpKind::InsertDim { .. } => "InsertDimC".into(),
            OpKind::Reshape { .. } => "Reshape".into(),
            OpKind::Broadcast { .. } => "Broadcast".into(),
            OpKind::GetItem { index } => format!("GetItem{}", IndexFmt(index)),
            OpKind::SetItem { index } => format!("SetItem{}", IndexFmt(index)),
            OpKind::UFunc(u) => format!("UFunc({})", u.name()),
            OpKind::Flatten => "Flatten".into(),
            OpKind::Module { module, .. } => format!("Module({})", module.name()),
        }
    }

    fn arity(&self) -> Option<usize> {
        match self {
            OpKind::Input { .. } | OpKind::Const(_) => Some(0),
            OpKind::Add | OpKind::Mul | OpKind::SetItem { .. } => Some(2),
            OpKind::UFunc(_) => None,
            _ => Some(1),
        }
    }
}

/// A backend attribute: an operator parameter or a marker.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attr {
    /// a number
    Int(i64),
    /// a name or marker
    Str(String),
}

impl Display for Attr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Attr::Int(i) => write!(f, "{i}"),
            Attr::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<usize> for Attr {
    fn from(i: usize) -> Self {
        Attr::Int(i as i64)
    }
}

impl From<isize> for Attr {
    fn from(i: isize) -> Self {
        Attr::Int(i as i64)
    }
}

impl From<&str> for Attr {
    fn from(s: &str) -> Self {
        Attr::Str(s.to_owned())
    }
}

/// Prefix a sequence with its length.
pub fn encode_seq<T: Into<Attr>, I: IntoIterator<Item = T>>(seq: I) -> Vec<Attr> {
    let items: Vec<Attr> = seq.into_iter().map(Into::into).collect();
    std::iter::once(Attr::from(items.len()))
        .chain(items)
        .collect()
}

/// The data of a node.
pub struct OpData {
    kind: OpKind,
    parents: Vec<Op>,
    shape: Shape,
    secrecy: Secrecy,
    encrypted: RefCell<Weak<OpData>>,
}

/// A node of the operator DAG. Cheap to clone; compared and hashed by identity.
#[derive(Clone)]
pub struct Op(Rc<OpData>);

impl PartialEq for Op {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Op {}

impl Hash for Op {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state)
    }
}

impl Debug for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Op")
            .field("op", &self.name())
            .field("shape", &self.0.shape)
            .field("secrecy", &self.0.secrecy)
            .field("parents", &self.0.parents.len())
            .finish()
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}{:?}", self.name(), self.0.shape)
    }
}

impl Drop for OpData {
    fn drop(&mut self) {
        // unlink long parent chains iteratively
        let mut stack = std::mem::take(&mut self.parents);
        while let Some(op) = stack.pop() {
            if let Ok(mut data) = Rc::try_unwrap(op.0) {
                stack.append(&mut data.parents);
            }
        }
    }
}

/// Make an operator node; see [Op::new].
///
/// ```ignore
/// let sum = op![OpKind::Add; x, y]?;
/// ```
#[macro_export]
macro_rules! op {
    ($kind:expr) => {
        $crate::ir::op::Op::new($kind, Vec::new())
    };
    ($kind:expr; $($p:expr),+) => {
        $crate::ir::op::Op::new($kind, vec![$($p.clone()),+])
    };
}

impl Op {
    /// Build a node, validating `kind` against `parents`.
    pub fn new(kind: OpKind, parents: Vec<Op>) -> Result<Op> {
        match kind.arity() {
            Some(n) if n != parents.len() => {
                return Err(Error::Arity {
                    op: kind.opcode(),
                    expected: n,
                    found: parents.len(),
                })
            }
            None if parents.is_empty() => {
                return Err(Error::Arity {
                    op: kind.opcode(),
                    expected: 1,
                    found: 0,
                })
            }
            _ => {}
        }

        let par_secrecy = Secrecy::join(parents.iter().map(Op::secrecy));
        let mut parents = if par_secrecy == Secrecy::Encrypted {
            parents.iter().map(Op::encrypted).collect()
        } else {
            parents
        };
        let declared = match &kind {
            OpKind::Input { secret: true, .. } => Secrecy::Secret,
            OpKind::Encrypt => Secrecy::Encrypted,
            _ => Secrecy::Public,
        };
        let secrecy = declared.max(par_secrecy);

        let (kind, shape) = infer(kind, &mut parents)?;
        if kind.is_input_op() && secrecy == Secrecy::Encrypted {
            return Err(Error::EncryptedOperand(kind.opcode()));
        }
        Ok(Op::make(kind, parents, shape, secrecy))
    }

    fn make(kind: OpKind, parents: Vec<Op>, shape: Shape, secrecy: Secrecy) -> Op {
        Op(Rc::new(OpData {
            kind,
            parents,
            shape,
            secrecy,
            encrypted: RefCell::new(Weak::new()),
        }))
    }

    /// A named program input.
    pub fn input(name: impl Into<String>, shape: Shape, secret: bool) -> Result<Op> {
        Op::new(
            OpKind::Input {
                name: name.into(),
                shape,
                secret,
            },
            Vec::new(),
        )
    }

    /// A Public constant.
    pub fn constant(t: impl Into<Rc<TensorV>>) -> Op {
        let t = t.into();
        let shape = t.shape().to_vec();
        Op::make(OpKind::Const(t), Vec::new(), shape, Secrecy::Public)
    }

    /// A Public 0-dimensional constant.
    pub fn scalar(v: f64) -> Op {
        Op::constant(ndarray::arr0(v).into_dyn())
    }

    /// Mark `par` as the program output `name`.
    pub fn output(par: &Op, name: impl Into<String>) -> Result<Op> {
        Op::new(OpKind::Output { name: name.into() }, vec![par.clone()])
    }

    /// The operator.
    pub fn kind(&self) -> &OpKind {
        &self.0.kind
    }
    /// The parents, in operand order.
    pub fn parents(&self) -> &[Op] {
        &self.0.parents
    }
    /// The static shape.
    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }
    /// The confidentiality.
    pub fn secrecy(&self) -> Secrecy {
        self.0.secrecy
    }
    /// Is this a ciphertext?
    pub fn is_encrypted(&self) -> bool {
        self.0.secrecy == Secrecy::Encrypted
    }
    /// Is this at least Secret?
    pub fn is_secret(&self) -> bool {
        self.0.secrecy >= Secrecy::Secret
    }
    /// Can the backend perform this operator on ciphertexts?
    pub fn is_enc_op(&self) -> bool {
        self.0.kind.is_enc_op()
    }
    /// Is this operator restricted to unencrypted operands?
    pub fn is_input_op(&self) -> bool {
        self.0.kind.is_input_op()
    }
    /// The name of an input node.
    pub fn input_name(&self) -> Option<&str> {
        match &self.0.kind {
            OpKind::Input { name, .. } => Some(name),
            _ => None,
        }
    }
    /// The name of an output node.
    pub fn output_name(&self) -> Option<&str> {
        match &self.0.kind {
            OpKind::Output { name } => Some(name),
            _ => None,
        }
    }
    /// The value of a constant node.
    pub fn const_value(&self) -> Option<&Rc<TensorV>> {
        match &self.0.kind {
            OpKind::Const(t) => Some(t),
            _ => None,
        }
    }

    /// This node as a ciphertext: a Secret node's (memoized) encryption, otherwise itself.
    pub fn encrypted(&self) -> Op {
        if self.0.secrecy != Secrecy::Secret {
            return self.clone();
        }
        if let Some(e) = self.0.encrypted.borrow().upgrade() {
            return Op(e);
        }
        let e = Op::make(
            OpKind::Encrypt,
            vec![self.clone()],
            self.0.shape.clone(),
            Secrecy::Encrypted,
        );
        *self.0.encrypted.borrow_mut() = Rc::downgrade(&e.0);
        e
    }

    /// The backend opcode. Binary operators append `C` per ciphertext operand, then `P` per
    /// plaintext operand, e.g., `MulCP`.
    pub fn name(&self) -> String {
        let base = self.0.kind.opcode();
        match self.0.kind {
            OpKind::Add | OpKind::Mul => {
                let c = self.parents().iter().filter(|p| p.is_encrypted()).count();
                let p = self.parents().len() - c;
                format!("{}{}{}", base, "C".repeat(c), "P".repeat(p))
            }
            _ => base,
        }
    }

    /// Operator parameters, as the backend expects them.
    pub fn attributes(&self) -> Vec<Attr> {
        match &self.0.kind {
            OpKind::Output { name } => vec![Attr::Str(name.clone())],
            OpKind::Rotate { dim, by } | OpKind::UnpaddedShift { dim, by } => {
                vec![(*dim).into(), (*by).into()]
            }
            OpKind::VectorRotate { by } => vec![Attr::Int(0), (*by).into()],
            OpKind::ReorderDim { order } => encode_seq(order.iter().copied()),
            OpKind::Stride { dim, by } => vec![(*dim).into(), (*by).into()],
            OpKind::Shrink { dim, size } | OpKind::Extend { dim, size } => {
                vec![(*dim).into(), (*size).into()]
            }
            OpKind::Sum { dim } | OpKind::DropDim { dim } | OpKind::InsertDim { dim } => {
                vec![(*dim).into()]
            }
            OpKind::Replicate { dim, n } => vec![(*dim).into(), (*n).into()],
            _ => Vec::new(),
        }
    }

    /// Estimated count of scalar operations the backend performs for this node.
    pub fn useful_ops(&self) -> usize {
        match self.0.kind {
            OpKind::Add | OpKind::Mul => numel(self.shape()),
            OpKind::Sum { .. } => numel(self.parents()[0].shape()),
            _ => 0,
        }
    }
}

/// Shape shared by every parent.
fn common_shape(kind: &OpKind, parents: &[Op]) -> Result<Shape> {
    let shape = parents[0].shape();
    if parents.iter().any(|p| p.shape() != shape) {
        Err(Error::ShapeMismatch {
            op: kind.opcode(),
            shapes: parents.iter().map(|p| p.shape().clone()).collect(),
        })
    } else {
        Ok(shape.clone())
    }
}

/// Validate `kind` against `parents`; return the normalized operator and the output shape.
fn infer(kind: OpKind, parents: &mut Vec<Op>) -> Result<(OpKind, Shape)> {
    let shape = match &kind {
        OpKind::Input { name, shape, .. } => {
            if !is_valid_name(name) {
                return Err(Error::InvalidName {
                    kind: "input",
                    name: name.clone(),
                });
            }
            shape.clone()
        }
        OpKind::Const(t) => t.shape().to_vec(),
        OpKind::Encrypt => {
            let s = parents[0].secrecy();
            if s != Secrecy::Secret {
                return Err(Error::EncryptNonSecret(s));
            }
            common_shape(&kind, parents)?
        }
        OpKind::Output { name } => {
            if !is_valid_name(name) {
                return Err(Error::InvalidName {
                    kind: "output",
                    name: name.clone(),
                });
            }
            if !parents[0].is_encrypted() {
                return Err(Error::UnencryptedOutput(name.clone()));
            }
            common_shape(&kind, parents)?
        }
        OpKind::Add | OpKind::Mul | OpKind::Bootstrap | OpKind::ChetRepack => {
            common_shape(&kind, parents)?
        }
        OpKind::Rotate { dim, by } | OpKind::UnpaddedShift { dim, by } => {
            let shape = common_shape(&kind, parents)?;
            let d = normalize_dim(&shape, *dim)?;
            if by.unsigned_abs() >= shape[d] {
                return Err(Error::InvalidShift {
                    shape,
                    dim: *dim,
                    by: *by,
                });
            }
            let (d, by) = (d as isize, *by);
            let kind = match kind {
                OpKind::Rotate { .. } => OpKind::Rotate { dim: d, by },
                _ => OpKind::UnpaddedShift { dim: d, by },
            };
            return Ok((kind, shape));
        }
        OpKind::VectorRotate { by } => {
            let shape = common_shape(&kind, parents)?;
            normalize_dim(&shape, 0)?;
            if by.unsigned_abs() >= shape[0] {
                return Err(Error::InvalidShift {
                    shape,
                    dim: 0,
                    by: *by,
                });
            }
            shape
        }
        OpKind::ReorderDim { order } => {
            let par = parents[0].shape();
            if order.len() > par.len() {
                return Err(Error::TooManyDims {
                    rank: par.len(),
                    order: order.clone(),
                });
            }
            let pad = par.len() - order.len();
            let mut full: Vec<usize> = (0..pad).collect();
            for d in order {
                full.push(normalize_dim(par, *d)?);
            }
            if !is_permutation(&full) {
                return Err(Error::NotAPermutation {
                    rank: par.len(),
                    order: order.clone(),
                });
            }
            let shape = full.iter().map(|&i| par[i]).collect();
            let order = full.into_iter().map(|i| i as isize).collect();
            return Ok((OpKind::ReorderDim { order }, shape));
        }
        OpKind::Stride { dim, by } => {
            let par = parents[0].shape();
            let d = normalize_dim(par, *dim)?;
            if !is_pow_of_2(*by) {
                return Err(Error::Stride(*by));
            }
            let shape = shape_with_dim(par, d, strided_size(par[d], *by));
            return Ok((OpKind::Stride { dim: d as isize, by: *by }, shape));
        }
        OpKind::Shrink { dim, size } | OpKind::Extend { dim, size } => {
            let par = parents[0].shape();
            let d = normalize_dim(par, *dim)?;
            let shrink = matches!(kind, OpKind::Shrink { .. });
            if shrink && *size > par[d] {
                return Err(Error::ShrinkGrows {
                    shape: par.clone(),
                    dim: *dim,
                    size: *size,
                });
            }
            if !shrink && *size < par[d] {
                return Err(Error::ExtendShrinks {
                    shape: par.clone(),
                    dim: *dim,
                    size: *size,
                });
            }
            let shape = shape_with_dim(par, d, *size);
            let (dim, size) = (d as isize, *size);
            let kind = if shrink {
                OpKind::Shrink { dim, size }
            } else {
                OpKind::Extend { dim, size }
            };
            return Ok((kind, shape));
        }
        OpKind::Sum { dim } => {
            let par = parents[0].shape();
            let d = normalize_dim(par, *dim)?;
            return Ok((OpKind::Sum { dim: d as isize }, shape_with_dim(par, d, 1)));
        }
        OpKind::Replicate { dim, n } => {
            let par = parents[0].shape();
            let d = normalize_dim(par, *dim)?;
            if par[d] != 1 {
                return Err(Error::NotUnitDim {
                    op: "replicate",
                    shape: par.clone(),
                    dim: *dim,
                });
            }
            let shape = shape_with_dim(par, d, *n);
            return Ok((OpKind::Replicate { dim: d as isize, n: *n }, shape));
        }
        OpKind::DropDim { dim } => {
            let par = parents[0].shape();
            let d = normalize_dim(par, *dim)?;
            if par[d] != 1 {
                return Err(Error::NotUnitDim {
                    op: "drop_dim",
                    shape: par.clone(),
                    dim: *dim,
                });
            }
            let mut shape = par.clone();
            shape.remove(d);
            return Ok((OpKind::DropDim { dim: d as isize }, shape));
        }
        OpKind::InsertDim { dim } => {
            let par = parents[0].shape();
            let d = normalize_insert_dim(par, *dim)?;
            let mut shape = par.clone();
            shape.insert(d, 1);
            return Ok((OpKind::InsertDim { dim: d as isize }, shape));
        }
        OpKind::Reshape { shape } => {
            let par = parents[0].shape();
            if numel(par) != numel(shape) {
                return Err(Error::ReshapeCount {
                    from: par.clone(),
                    to: shape.clone(),
                });
            }
            shape.clone()
        }
        OpKind::Broadcast { shape } => {
            let par = parents[0].shape();
            if !broadcasts_to(par, shape) {
                return Err(Error::Broadcast {
                    from: par.clone(),
                    to: shape.clone(),
                });
            }
            shape.clone()
        }
        OpKind::GetItem { index } => indexed_shape(parents[0].shape(), index)?,
        OpKind::SetItem { index } => {
            let selected = indexed_shape(parents[0].shape(), index)?;
            if !broadcasts_to(parents[1].shape(), &selected) {
                return Err(Error::Broadcast {
                    from: parents[1].shape().clone(),
                    to: selected,
                });
            }
            parents[0].shape().clone()
        }
        OpKind::UFunc(_) => {
            let shapes: Vec<&[usize]> = parents.iter().map(|p| p.shape().as_slice()).collect();
            broadcast_shapes(&shapes)?
        }
        OpKind::Flatten => vec![numel(parents[0].shape())],
        OpKind::Module { module, prefix } => {
            let shape = module.output_shape(parents[0].shape())?;
            for (key, w_shape) in module.params() {
                let name = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                parents.push(Op::input(name, w_shape, false)?);
            }
            shape
        }
    };
    Ok((kind, shape))
}
