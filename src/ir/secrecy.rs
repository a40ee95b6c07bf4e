//! The confidentiality lattice

use std::fmt::{self, Display, Formatter};

/// How confidential a value is.
///
/// Totally ordered: `Public < Secret < Encrypted`. A node is as confidential as its most
/// confidential parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Secrecy {
    /// Cleartext known to everyone, e.g., constants and weights
    Public,
    /// Private data that has not been encrypted yet
    Secret,
    /// Ciphertext
    Encrypted,
}

impl Secrecy {
    /// The most confidential of `it`, or `Public` if empty.
    pub fn join<I: IntoIterator<Item = Secrecy>>(it: I) -> Secrecy {
        it.into_iter().max().unwrap_or(Secrecy::Public)
    }
}

impl Default for Secrecy {
    fn default() -> Self {
        Secrecy::Public
    }
}

impl Display for Secrecy {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Secrecy::Public => write!(f, "public"),
            Secrecy::Secret => write!(f, "secret"),
            Secrecy::Encrypted => write!(f, "encrypted"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for Secrecy {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&[Secrecy::Public, Secrecy::Secret, Secrecy::Encrypted])
                .unwrap()
        }
    }

    #[test]
    fn order() {
        assert!(Secrecy::Public < Secrecy::Secret);
        assert!(Secrecy::Secret < Secrecy::Encrypted);
    }

    #[test]
    fn join() {
        assert_eq!(Secrecy::join(vec![]), Secrecy::Public);
        assert_eq!(
            Secrecy::join(vec![Secrecy::Secret, Secrecy::Public]),
            Secrecy::Secret
        );
        assert_eq!(
            Secrecy::join(vec![Secrecy::Encrypted, Secrecy::Secret]),
            Secrecy::Encrypted
        );
    }

    #[quickcheck]
    fn join_is_commutative(a: Secrecy, b: Secrecy) -> bool {
        Secrecy::join([a, b]) == Secrecy::join([b, a])
    }

    #[quickcheck]
    fn join_is_associative(a: Secrecy, b: Secrecy, c: Secrecy) -> bool {
        let ab = Secrecy::join([a, b]);
        let bc = Secrecy::join([b, c]);
        Secrecy::join([ab, c]) == Secrecy::join([a, bc])
    }

    #[quickcheck]
    fn join_is_least_upper_bound(xs: Vec<Secrecy>) -> bool {
        let j = Secrecy::join(xs.clone());
        xs.iter().all(|x| *x <= j) && (xs.is_empty() || xs.contains(&j))
    }

    #[quickcheck]
    fn join_is_idempotent(a: Secrecy) -> bool {
        Secrecy::join([a, a]) == a && Secrecy::join([a, Secrecy::Public]) == a
    }
}
