//! Errors raised while building, evaluating, or serializing a dataflow

use thiserror::Error;

use super::secrecy::Secrecy;
use super::shape::Shape;

#[derive(Error, Debug)]
/// An error in graph construction or evaluation
pub enum Error {
    #[error("Operands of '{op}' have differing shapes: {shapes:?}")]
    /// Parents of an elementwise operator must share a shape
    ShapeMismatch {
        /// the operator
        op: String,
        /// the parent shapes
        shapes: Vec<Shape>,
    },
    #[error("Cannot broadcast {from:?} to {to:?}")]
    /// The source shape is not broadcast-compatible with the target
    Broadcast {
        /// source shape
        from: Shape,
        /// target shape
        to: Shape,
    },
    #[error("Shapes {0:?} have no common broadcast shape")]
    /// A set of shapes that cannot be broadcast together
    BroadcastShapes(Vec<Shape>),
    #[error("Reshape cannot change the number of elements: {from:?} to {to:?}")]
    /// Reshaping to a shape with a different element count
    ReshapeCount {
        /// source shape
        from: Shape,
        /// target shape
        to: Shape,
    },
    #[error("Invalid dimension {dim} for shape {shape:?}")]
    /// A dimension index out of range
    InvalidDim {
        /// the requested dimension
        dim: isize,
        /// the shape it was applied to
        shape: Shape,
    },
    #[error("Invalid shift by {by} along dimension {dim} of {shape:?}")]
    /// A shift amount at least as large as the dimension
    InvalidShift {
        /// the shape
        shape: Shape,
        /// the dimension
        dim: isize,
        /// the amount
        by: isize,
    },
    #[error("Shrink increases dimension {dim} of {shape:?} to {size}")]
    /// `shrink` to a larger size
    ShrinkGrows {
        /// the shape
        shape: Shape,
        /// the dimension
        dim: isize,
        /// the requested size
        size: usize,
    },
    #[error("Extend decreases dimension {dim} of {shape:?} to {size}")]
    /// `extend` to a smaller size
    ExtendShrinks {
        /// the shape
        shape: Shape,
        /// the dimension
        dim: isize,
        /// the requested size
        size: usize,
    },
    #[error("Order {order:?} names more dimensions than the {rank} available")]
    /// A dimension order longer than the operand's rank
    TooManyDims {
        /// operand rank
        rank: usize,
        /// the requested order
        order: Vec<isize>,
    },
    #[error("Order {order:?} is not a permutation of {rank} dimensions")]
    /// A dimension order that is not a permutation
    NotAPermutation {
        /// operand rank
        rank: usize,
        /// the requested order
        order: Vec<isize>,
    },
    #[error("Non-power-of-2 stride {0}")]
    /// A stride that is zero or not a power of two
    Stride(usize),
    #[error("'{op}' requires dimension {dim} of {shape:?} to have size 1")]
    /// An operator that needs a unit dimension
    NotUnitDim {
        /// the operator
        op: &'static str,
        /// the shape
        shape: Shape,
        /// the dimension
        dim: isize,
    },
    #[error("Invalid index {index} for shape {shape:?}")]
    /// An index that does not fit the shape
    InvalidIndex {
        /// the shape
        shape: Shape,
        /// the offending index, rendered
        index: String,
    },
    #[error("'{op}' expects {expected} operands, got {found}")]
    /// Wrong number of parents for an operator
    Arity {
        /// the operator
        op: String,
        /// expected count
        expected: usize,
        /// actual count
        found: usize,
    },
    #[error("Operation '{0}' does not support encrypted data")]
    /// Encrypted data reached an unencrypted-only operator
    EncryptedOperand(String),
    #[error("Only secret values can be encrypted, got a {0} value")]
    /// Encrypting a value that is not Secret
    EncryptNonSecret(Secrecy),
    #[error("Unencrypted program output '{0}'")]
    /// An output whose value is not Encrypted
    UnencryptedOutput(String),
    #[error("Cannot create an Input from an already encrypted value")]
    /// Wrapping an Encrypted node as an Input value
    EncryptedInput,
    #[error("Vectors must have at most 1 dimension, got {0:?}")]
    /// A Vector value of rank above one
    VectorRank(Shape),
    #[error("Vector size must be a power of 2, got {0:?}")]
    /// A Vector value whose length is not a power of two
    VectorSize(Shape),
    #[error("Operation has no value operand")]
    /// The value protocol was given only scalars
    NoValueOperand,
    #[error("Operand families cannot be combined")]
    /// The operand families cannot be combined by this value type
    NotSupported,
    #[error("Invalid {kind} name '{name}'")]
    /// A malformed input or output name
    InvalidName {
        /// "input" or "output"
        kind: &'static str,
        /// the name
        name: String,
    },
    #[error("Output '{0}' is declared twice")]
    /// Two outputs with one name
    DuplicateOutput(String),
    #[error("Input '{name}' is declared with shapes {first:?} and {second:?}")]
    /// Two inputs with one name but different shapes
    ConflictingInput {
        /// the name
        name: String,
        /// first shape seen
        first: Shape,
        /// second shape seen
        second: Shape,
    },
    #[error("Missing input '{0}'")]
    /// A declared input absent from the input map
    MissingInput(String),
    #[error("Unexpected shape for '{name}': {found:?}, expected {expected:?}")]
    /// An input tensor shaped differently than its declaration
    InputShape {
        /// the name
        name: String,
        /// declared shape
        expected: Shape,
        /// supplied shape
        found: Shape,
    },
    #[error("Input '{0}' has no value; inputs must be bound, not evaluated")]
    /// Evaluating an Input node directly
    EvaluateInput(String),
    #[error("Module '{name}': {msg}")]
    /// A host module rejected its input
    Module {
        /// module name
        name: String,
        /// what went wrong
        msg: String,
    },
    #[error("Invalid operand shapes for '{kernel}': {shapes:?}")]
    /// A library function given operands it cannot combine
    KernelShape {
        /// the function
        kernel: &'static str,
        /// the operand shapes
        shapes: Vec<Shape>,
    },
    #[error("'{0}' requires a non-empty sequence")]
    /// A reduction over an empty sequence
    EmptySequence(&'static str),
    #[error("No sign polynomial of precision {0}")]
    /// An unknown sign-approximation precision
    SignAlpha(usize),
    #[error("Array error: {0}")]
    /// An error from the dense-array library
    Array(#[from] ndarray::ShapeError),
    #[error("Tensor file: {0}")]
    /// Malformed tensor file
    TensorParse(String),
    #[error("Tensor file declares {declared} elements but its shape {shape:?} holds {expected}")]
    /// Declared element count disagrees with the shape
    ElementCount {
        /// the shape
        shape: Shape,
        /// product of the shape
        expected: usize,
        /// the declared count
        declared: usize,
    },
    #[error("I/O error: {0}")]
    /// An I/O failure
    Io(#[from] std::io::Error),
}

/// Result of graph construction or evaluation
pub type Result<T> = std::result::Result<T, Error>;
