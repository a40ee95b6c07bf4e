//! Operator syntax for the value types. Every operator returns a [Result].

use super::{HostInput, OpInput, OpTensor, OpVector, Vector};
use crate::ir::error::Result;

macro_rules! arith_ops {
    ($($ty:ty),*) => {
        $(
            impl std::ops::Add<&$ty> for &$ty {
                type Output = Result<$ty>;
                fn add(self, rhs: &$ty) -> Result<$ty> {
                    Vector::add(self, rhs)
                }
            }
            impl std::ops::Add<f64> for &$ty {
                type Output = Result<$ty>;
                fn add(self, rhs: f64) -> Result<$ty> {
                    Vector::add(self, rhs)
                }
            }
            impl std::ops::Add<&$ty> for f64 {
                type Output = Result<$ty>;
                fn add(self, rhs: &$ty) -> Result<$ty> {
                    rhs.radd(self)
                }
            }
            impl std::ops::Mul<&$ty> for &$ty {
                type Output = Result<$ty>;
                fn mul(self, rhs: &$ty) -> Result<$ty> {
                    Vector::mul(self, rhs)
                }
            }
            impl std::ops::Mul<f64> for &$ty {
                type Output = Result<$ty>;
                fn mul(self, rhs: f64) -> Result<$ty> {
                    Vector::mul(self, rhs)
                }
            }
            impl std::ops::Mul<&$ty> for f64 {
                type Output = Result<$ty>;
                fn mul(self, rhs: &$ty) -> Result<$ty> {
                    Vector::mul(rhs, self)
                }
            }
            impl std::ops::Sub<&$ty> for &$ty {
                type Output = Result<$ty>;
                fn sub(self, rhs: &$ty) -> Result<$ty> {
                    Vector::sub(self, rhs)
                }
            }
            impl std::ops::Sub<f64> for &$ty {
                type Output = Result<$ty>;
                fn sub(self, rhs: f64) -> Result<$ty> {
                    Vector::sub(self, rhs)
                }
            }
            impl std::ops::Sub<&$ty> for f64 {
                type Output = Result<$ty>;
                fn sub(self, rhs: &$ty) -> Result<$ty> {
                    rhs.rsub(self)
                }
            }
            impl std::ops::Neg for &$ty {
                type Output = Result<$ty>;
                fn neg(self) -> Result<$ty> {
                    Vector::neg(self)
                }
            }
        )*
    };
}

arith_ops!(OpVector, OpTensor, OpInput, HostInput);
