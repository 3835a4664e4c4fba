//! Forward operators. Each call reads its operands, computes the value and
//! appends one node (or a few, for the composed operators) to the tape.

use crate::{
    error::GraphError,
    node::{NodeId, OpKind},
    tape::{Tape, TapeTerm},
};

impl Tape {
    pub fn leaf(&self, value: f64) -> Result<TapeTerm<'_>, GraphError> {
        let id = self.create_leaf(value)?;
        Ok(self.wrap(id))
    }

    pub fn add<'a>(&'a self, a: TapeTerm<'a>, b: TapeTerm<'a>) -> Result<TapeTerm<'a>, GraphError> {
        self.binary(OpKind::Add, a, b)
    }

    pub fn multiply<'a>(
        &'a self,
        a: TapeTerm<'a>,
        b: TapeTerm<'a>,
    ) -> Result<TapeTerm<'a>, GraphError> {
        self.binary(OpKind::Mul, a, b)
    }

    /// `a` raised to the real power `b`. A negative base with a fractional
    /// exponent gives NaN.
    pub fn power<'a>(&'a self, a: TapeTerm<'a>, b: TapeTerm<'a>) -> Result<TapeTerm<'a>, GraphError> {
        self.binary(OpKind::Pow, a, b)
    }

    pub fn relu<'a>(&'a self, a: TapeTerm<'a>) -> Result<TapeTerm<'a>, GraphError> {
        let a = self.own(a)?;
        let id = self.create_op(OpKind::Relu, &[a])?;
        Ok(self.wrap(id))
    }

    /// A fresh leaf holding `-a`. It has no edge back to `a`, so no gradient
    /// reaches `a` through it.
    pub fn negate<'a>(&'a self, a: TapeTerm<'a>) -> Result<TapeTerm<'a>, GraphError> {
        self.own(a)?;
        self.leaf(-a.value())
    }

    /// `a + (-b)`, with `-b` built by [`Tape::negate`]. After a reverse pass
    /// `b` keeps whatever gradient it had; only the negated leaf receives one.
    ///
    /// Nothing is left on the tape if the call fails.
    pub fn subtract<'a>(
        &'a self,
        a: TapeTerm<'a>,
        b: TapeTerm<'a>,
    ) -> Result<TapeTerm<'a>, GraphError> {
        self.own(a)?;
        self.own(b)?;
        self.atomic(|| {
            let neg = self.negate(b)?;
            self.add(a, neg)
        })
    }

    /// `a * b^-1`. The gradient of `b` flows through the reciprocal node.
    ///
    /// Nothing is left on the tape if the call fails.
    pub fn divide<'a>(&'a self, a: TapeTerm<'a>, b: TapeTerm<'a>) -> Result<TapeTerm<'a>, GraphError> {
        self.own(a)?;
        self.own(b)?;
        self.atomic(|| {
            let exponent = self.leaf(-1.)?;
            let reciprocal = self.power(b, exponent)?;
            self.multiply(a, reciprocal)
        })
    }

    fn binary<'a>(
        &'a self,
        kind: OpKind,
        a: TapeTerm<'a>,
        b: TapeTerm<'a>,
    ) -> Result<TapeTerm<'a>, GraphError> {
        let operands = [self.own(a)?, self.own(b)?];
        let id = self.create_op(kind, &operands)?;
        Ok(self.wrap(id))
    }

    fn own(&self, term: TapeTerm<'_>) -> Result<NodeId, GraphError> {
        if std::ptr::eq(self, term.tape) {
            Ok(term.id())
        } else {
            Err(GraphError::ForeignTerm)
        }
    }

    fn wrap(&self, id: NodeId) -> TapeTerm<'_> {
        TapeTerm {
            tape: self,
            idx: id.0,
        }
    }
}

fn unwrap_term(res: Result<TapeTerm<'_>, GraphError>) -> TapeTerm<'_> {
    match res {
        Ok(term) => term,
        Err(e) => panic!("{e}"),
    }
}

impl<'a> TapeTerm<'a> {
    pub fn pow(self, rhs: Self) -> Self {
        unwrap_term(self.tape.power(self, rhs))
    }

    pub fn powf(self, rhs: f64) -> Self {
        let tape = self.tape;
        unwrap_term(tape.atomic(|| {
            let exponent = tape.leaf(rhs)?;
            tape.power(self, exponent)
        }))
    }

    pub fn relu(self) -> Self {
        unwrap_term(self.tape.relu(self))
    }
}

// The operator overloads below panic where the fallible `Tape` methods would
// return an error: a full tape or terms from two different tapes.

impl<'a> std::ops::Add for TapeTerm<'a> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        unwrap_term(self.tape.add(self, rhs))
    }
}

impl<'a> std::ops::Sub for TapeTerm<'a> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        unwrap_term(self.tape.subtract(self, rhs))
    }
}

impl<'a> std::ops::Mul for TapeTerm<'a> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        unwrap_term(self.tape.multiply(self, rhs))
    }
}

impl<'a> std::ops::Div for TapeTerm<'a> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        unwrap_term(self.tape.divide(self, rhs))
    }
}

impl<'a> std::ops::Neg for TapeTerm<'a> {
    type Output = Self;
    fn neg(self) -> Self::Output {
        unwrap_term(self.tape.negate(self))
    }
}
