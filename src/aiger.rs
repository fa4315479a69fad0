//! AIGER circuits.
//!
//! Implements an in-memory and-inverter graph with latches. Reading and
//! writing of the ASCII AIGER format go through `flussab-aiger`; this module
//! converts its [`Aig`] into a [`Circuit`] and back, and checks the
//! restrictions synthesis relies on:
//!
//! - no bad-state, constraint, justice or fairness sections,
//! - every latch resets to 0,
//! - every variable is defined at most once and the and-gates are acyclic,
//! - the maximum variable index is at most [`MAX_VARIABLE`].
//!
//! A literal is `2 * variable + sign`; literal 0 is constant false and
//! literal 1 is constant true.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io;
use std::io::{Read, Write};
use std::ops::Not;
use std::path::Path;
use std::str::FromStr;

use flussab::DeferredWriter;
use flussab_aiger::aig::{self, Aig};
use flussab_aiger::{ascii, ParseError};

/// Symbol-name prefix marking an input as controllable.
pub const CONTROLLABLE_PREFIX: &str = "controllable";

/// Largest variable index a circuit may use, fresh variables included.
///
/// Both literals of a variable and the primed partner of its positive
/// literal must fit in a `u32` BDD variable.
pub const MAX_VARIABLE: u32 = (1 << 30) - 1;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Literal(u32);

impl Literal {
    pub const FALSE: Literal = Literal(0);
    pub const TRUE: Literal = Literal(1);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Panics if `variable` exceeds [`MAX_VARIABLE`].
    pub const fn from_variable(variable: u32, negated: bool) -> Self {
        assert!(variable <= MAX_VARIABLE);
        Self((variable << 1) | negated as u32)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn variable(self) -> u32 {
        self.0 >> 1
    }

    pub const fn is_negated(self) -> bool {
        self.0 & 1 != 0
    }

    pub const fn is_constant(self) -> bool {
        self.variable() == 0
    }

    /// The positive (even) literal of the same variable.
    pub const fn strip(self) -> Self {
        Self(self.0 & !1)
    }
}

impl Not for Literal {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Input {
    pub literal: Literal,
    pub name: Option<String>,
}

impl Input {
    pub fn is_controllable(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.trim().starts_with(CONTROLLABLE_PREFIX))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Latch {
    pub literal: Literal,
    pub next: Literal,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Output {
    pub literal: Literal,
    pub name: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AndGate {
    pub lhs: Literal,
    pub rhs0: Literal,
    pub rhs1: Literal,
}

/// What defines a positive literal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Definition {
    Input,
    Latch,
    And(usize),
}

/// Error type for AIGER reading and circuit editing.
#[derive(Debug)]
pub enum AigerError {
    /// File I/O error.
    Io(io::Error),
    /// Malformed AIGER text.
    Parse(ParseError),
    /// Valid AIGER this tool does not handle.
    Unsupported(String),
    /// A literal that cannot be defined or used where it is.
    InvalidLiteral { literal: Literal, reason: &'static str },
    /// The and-gates form a combinational loop through this literal.
    Cycle(Literal),
    /// Only inputs can be turned into and-gates.
    NotAnInput(Literal),
}

impl From<io::Error> for AigerError {
    fn from(e: io::Error) -> Self {
        AigerError::Io(e)
    }
}

impl From<ParseError> for AigerError {
    fn from(e: ParseError) -> Self {
        AigerError::Parse(e)
    }
}

impl Display for AigerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AigerError::Io(e) => write!(f, "I/O error: {}", e),
            AigerError::Parse(e) => write!(f, "Parse error: {}", e),
            AigerError::Unsupported(msg) => write!(f, "Unsupported AIGER feature: {}", msg),
            AigerError::InvalidLiteral { literal, reason } => {
                write!(f, "Invalid literal {}: {}", literal, reason)
            }
            AigerError::Cycle(lit) => write!(f, "Combinational cycle through literal {}", lit),
            AigerError::NotAnInput(lit) => write!(f, "Literal {} is not an input", lit),
        }
    }
}

impl std::error::Error for AigerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AigerError::Io(e) => Some(e),
            AigerError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// A sequential and-inverter graph.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    maxvar: u32,
    inputs: Vec<Input>,
    latches: Vec<Latch>,
    outputs: Vec<Output>,
    ands: Vec<AndGate>,
    definitions: HashMap<Literal, Definition>,
    comment: Option<String>,
}

impl Circuit {
    /// Largest variable index in use (or reserved).
    pub fn maxvar(&self) -> u32 {
        self.maxvar
    }
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }
    pub fn latches(&self) -> &[Latch] {
        &self.latches
    }
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }
    pub fn ands(&self) -> &[AndGate] {
        &self.ands
    }
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn controllable_inputs(&self) -> impl Iterator<Item = &Input> + '_ {
        self.inputs.iter().filter(|input| input.is_controllable())
    }
    pub fn uncontrollable_inputs(&self) -> impl Iterator<Item = &Input> + '_ {
        self.inputs.iter().filter(|input| !input.is_controllable())
    }

    /// What defines the variable of `lit`, if anything.
    pub fn definition(&self, lit: Literal) -> Option<Definition> {
        self.definitions.get(&lit.strip()).copied()
    }

    pub fn and_gate(&self, lit: Literal) -> Option<&AndGate> {
        match self.definition(lit) {
            Some(Definition::And(i)) => Some(&self.ands[i]),
            _ => None,
        }
    }

    /// Reserve a new variable and return its positive literal.
    ///
    /// Fresh literals are strictly greater than every literal seen so far.
    /// Fails once [`MAX_VARIABLE`] is reached.
    pub fn fresh_literal(&mut self) -> Result<Literal, AigerError> {
        let variable = self
            .maxvar
            .checked_add(1)
            .filter(|&v| v <= MAX_VARIABLE)
            .ok_or_else(|| {
                AigerError::Unsupported(format!("more than {} variables", MAX_VARIABLE))
            })?;
        self.maxvar = variable;
        Ok(Literal::from_variable(variable, false))
    }

    fn define(&mut self, lit: Literal, definition: Definition) {
        self.maxvar = self.maxvar.max(lit.variable());
        self.definitions.insert(lit, definition);
    }

    /// Add a new and-gate over `rhs0` and `rhs1` with a fresh output literal.
    pub fn add_and(&mut self, rhs0: Literal, rhs1: Literal) -> Result<Literal, AigerError> {
        let lhs = self.fresh_literal()?;
        self.define(lhs, Definition::And(self.ands.len()));
        self.ands.push(AndGate { lhs, rhs0, rhs1 });
        Ok(lhs)
    }

    /// Turn the input `lit` into the and-gate `lit = rhs0 ∧ rhs1`.
    pub fn redefine_input_as_and(
        &mut self,
        lit: Literal,
        rhs0: Literal,
        rhs1: Literal,
    ) -> Result<(), AigerError> {
        if lit.is_negated() || self.definition(lit) != Some(Definition::Input) {
            return Err(AigerError::NotAnInput(lit));
        }
        self.inputs.retain(|input| input.literal != lit);
        self.define(lit, Definition::And(self.ands.len()));
        self.ands.push(AndGate { lhs: lit, rhs0, rhs1 });
        Ok(())
    }

    /// Check that the and-gates are acyclic.
    pub fn check_acyclic(&self) -> Result<(), AigerError> {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Mark {
            Open,
            Done,
        }

        let mut marks: HashMap<Literal, Mark> = HashMap::new();
        for gate in &self.ands {
            if marks.contains_key(&gate.lhs) {
                continue;
            }
            // (literal, children pushed)
            let mut stack = vec![(gate.lhs, false)];
            while let Some((lit, expanded)) = stack.pop() {
                if expanded {
                    marks.insert(lit, Mark::Done);
                    continue;
                }
                match marks.get(&lit) {
                    Some(Mark::Done) => continue,
                    Some(Mark::Open) => return Err(AigerError::Cycle(lit)),
                    None => {}
                }
                marks.insert(lit, Mark::Open);
                stack.push((lit, true));
                if let Some(g) = self.and_gate(lit) {
                    for child in [g.rhs0.strip(), g.rhs1.strip()] {
                        match marks.get(&child) {
                            Some(Mark::Open) => return Err(AigerError::Cycle(child)),
                            Some(Mark::Done) => {}
                            None => {
                                if self.and_gate(child).is_some() {
                                    stack.push((child, false));
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn code(lit: Literal) -> usize {
    lit.raw() as usize
}

impl Circuit {
    /// Reads a circuit from an ASCII AIGER file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AigerError> {
        let file = File::open(path)?;
        Self::read_from(file)
    }

    pub fn read_from(reader: impl Read) -> Result<Self, AigerError> {
        let mut parser = ascii::Parser::<usize>::from_read(reader, ascii::Config::default())?;
        let aig = parser.parse()?;
        Self::from_aig(aig)
    }

    fn literal(&self, raw: usize) -> Result<Literal, AigerError> {
        let literal = u32::try_from(raw).map(Literal::new).map_err(|_| {
            AigerError::Unsupported(format!("literal {} exceeds the variable limit", raw))
        })?;
        if literal.variable() > self.maxvar {
            return Err(AigerError::InvalidLiteral {
                literal,
                reason: "variable index exceeds the header maximum",
            });
        }
        Ok(literal)
    }

    fn definable(&self, raw: usize) -> Result<Literal, AigerError> {
        let literal = self.literal(raw)?;
        let invalid = |reason| AigerError::InvalidLiteral { literal, reason };
        if literal.is_negated() {
            return Err(invalid("defined literals must be even"));
        }
        if literal.is_constant() {
            return Err(invalid("constants cannot be redefined"));
        }
        if self.definitions.contains_key(&literal) {
            return Err(invalid("literal defined twice"));
        }
        Ok(literal)
    }

    /// Converts a parsed AIG, rejecting what synthesis does not handle.
    fn from_aig(aig: Aig<usize>) -> Result<Self, AigerError> {
        let maxvar = u32::try_from(aig.max_var_index)
            .ok()
            .filter(|&m| m <= MAX_VARIABLE)
            .ok_or_else(|| {
                AigerError::Unsupported(format!(
                    "maximum variable index {} exceeds {}",
                    aig.max_var_index, MAX_VARIABLE
                ))
            })?;
        if !aig.bad_state_properties.is_empty()
            || !aig.invariant_constraints.is_empty()
            || !aig.justice_properties.is_empty()
            || !aig.fairness_constraints.is_empty()
        {
            return Err(AigerError::Unsupported(
                "bad-state, constraint, justice or fairness sections".into(),
            ));
        }

        let mut circuit = Circuit {
            maxvar,
            ..Circuit::default()
        };

        for &input in &aig.inputs {
            let literal = circuit.definable(input)?;
            circuit.define(literal, Definition::Input);
            circuit.inputs.push(Input { literal, name: None });
        }

        for latch in &aig.latches {
            if latch.initialization != Some(false) {
                return Err(AigerError::Unsupported(format!(
                    "latch {} does not reset to 0",
                    latch.state
                )));
            }
            let literal = circuit.definable(latch.state)?;
            let next = circuit.literal(latch.next_state)?;
            circuit.define(literal, Definition::Latch);
            circuit.latches.push(Latch {
                literal,
                next,
                name: None,
            });
        }

        for &output in &aig.outputs {
            let literal = circuit.literal(output)?;
            circuit.outputs.push(Output { literal, name: None });
        }

        for gate in &aig.and_gates {
            let lhs = circuit.definable(gate.output)?;
            let rhs0 = circuit.literal(gate.inputs[0])?;
            let rhs1 = circuit.literal(gate.inputs[1])?;
            circuit.define(lhs, Definition::And(circuit.ands.len()));
            circuit.ands.push(AndGate { lhs, rhs0, rhs1 });
        }

        for symbol in &aig.symbols {
            let slot = match symbol.target {
                aig::SymbolTarget::Input(i) => circuit.inputs.get_mut(i).map(|s| &mut s.name),
                aig::SymbolTarget::Latch(i) => circuit.latches.get_mut(i).map(|s| &mut s.name),
                aig::SymbolTarget::Output(i) => circuit.outputs.get_mut(i).map(|s| &mut s.name),
                _ => None,
            };
            if let Some(slot) = slot {
                *slot = Some(symbol.name.to_string());
            }
        }
        circuit.comment = aig.comment.map(|comment| comment.to_string());

        circuit.check_acyclic()?;
        Ok(circuit)
    }

    fn to_aig(&self) -> Aig<usize> {
        let inputs = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| (aig::SymbolTarget::Input(i), &input.name));
        let latches = self
            .latches
            .iter()
            .enumerate()
            .map(|(i, latch)| (aig::SymbolTarget::Latch(i), &latch.name));
        let outputs = self
            .outputs
            .iter()
            .enumerate()
            .map(|(i, output)| (aig::SymbolTarget::Output(i), &output.name));
        let symbols = inputs
            .chain(latches)
            .chain(outputs)
            .filter_map(|(target, name)| {
                let name = name.as_ref()?;
                Some(aig::Symbol {
                    target,
                    name: name.clone().into(),
                })
            })
            .collect();

        Aig {
            max_var_index: self.maxvar as usize,
            inputs: self.inputs.iter().map(|input| code(input.literal)).collect(),
            latches: self
                .latches
                .iter()
                .map(|latch| aig::Latch {
                    state: code(latch.literal),
                    next_state: code(latch.next),
                    initialization: Some(false),
                })
                .collect(),
            outputs: self.outputs.iter().map(|output| code(output.literal)).collect(),
            bad_state_properties: vec![],
            invariant_constraints: vec![],
            justice_properties: vec![],
            fairness_constraints: vec![],
            and_gates: self
                .ands
                .iter()
                .map(|gate| aig::AndGate {
                    output: code(gate.lhs),
                    inputs: [code(gate.rhs0), code(gate.rhs1)],
                })
                .collect(),
            symbols,
            comment: self.comment.clone().map(Into::into),
        }
    }

    /// Writes the circuit in ASCII AIGER format.
    pub fn write_to(&self, out: impl Write) -> io::Result<()> {
        let aig = self.to_aig();
        let mut dwriter = DeferredWriter::from_write(out);
        let mut writer = ascii::Writer::new(&mut dwriter);
        writer.write_aig(&aig);
        writer.check_io_error()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AigerError> {
        let file = File::create(path)?;
        self.write_to(file)?;
        Ok(())
    }
}

impl FromStr for Circuit {
    type Err = AigerError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Self::read_from(content.as_bytes())
    }
}

impl Display for Circuit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer).map_err(|_| std::fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buffer))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const TOGGLE: &str = "\
aag 3 1 1 1 1
2
4 7
6
6 2 4
i0 controllable_go
l0 state
o0 err
c
a comment line
";

    #[test]
    fn test_literal() {
        let lit = Literal::from_variable(3, true);
        assert_eq!(lit.raw(), 7);
        assert_eq!(lit.variable(), 3);
        assert!(lit.is_negated());
        assert_eq!(lit.strip(), Literal::new(6));
        assert_eq!(!lit, Literal::new(6));
        assert!(Literal::TRUE.is_constant());
        assert_eq!(!Literal::FALSE, Literal::TRUE);
    }

    #[test]
    fn test_parse() {
        let circuit: Circuit = TOGGLE.parse().unwrap();
        assert_eq!(circuit.maxvar(), 3);
        assert_eq!(circuit.inputs().len(), 1);
        assert!(circuit.inputs()[0].is_controllable());
        assert_eq!(circuit.latches()[0].next, Literal::new(7));
        assert_eq!(circuit.latches()[0].name.as_deref(), Some("state"));
        assert_eq!(circuit.outputs()[0].literal, Literal::new(6));
        assert_eq!(circuit.outputs()[0].name.as_deref(), Some("err"));
        assert_eq!(circuit.definition(Literal::new(5)), Some(Definition::Latch));
        assert_eq!(circuit.definition(Literal::new(3)), Some(Definition::Input));
        let gate = circuit.and_gate(Literal::new(6)).unwrap();
        assert_eq!((gate.rhs0, gate.rhs1), (Literal::new(2), Literal::new(4)));
        assert_eq!(circuit.comment().map(str::trim), Some("a comment line"));
    }

    #[test]
    fn test_write_and_read_back() {
        let circuit = Circuit::read_from(TOGGLE.as_bytes()).unwrap();
        let written = circuit.to_string();
        assert!(written.starts_with("aag 3 1 1 1 1\n"));
        assert!(written.contains("\n6 2 4\n"));

        let reread: Circuit = written.parse().unwrap();
        assert_eq!(reread.maxvar(), circuit.maxvar());
        assert_eq!(reread.inputs(), circuit.inputs());
        assert_eq!(reread.latches(), circuit.latches());
        assert_eq!(reread.outputs(), circuit.outputs());
        assert_eq!(reread.ands(), circuit.ands());
        assert_eq!(reread.to_string(), written);
    }

    #[test]
    fn test_build() {
        // Gate the toggle latch with its own error output.
        let mut circuit: Circuit = TOGGLE.parse().unwrap();
        let state = circuit.latches()[0].literal;
        let err = circuit.outputs()[0].literal;
        let gated = circuit.add_and(state, !err).unwrap();
        assert_eq!(gated, Literal::new(8));
        assert_eq!(circuit.definition(gated), Some(Definition::And(1)));
        circuit.check_acyclic().unwrap();

        let reread: Circuit = circuit.to_string().parse().unwrap();
        assert_eq!(reread.maxvar(), 4);
        let gate = reread.and_gate(gated).copied().unwrap();
        assert_eq!((gate.rhs0, gate.rhs1), (state, !err));
    }

    #[test]
    fn test_controllable_naming() {
        let text = "aag 2 2 0 1 0\n2\n4\n2\ni0 controllable_a\ni1 env\n";
        let circuit: Circuit = text.parse().unwrap();
        let c: Vec<_> = circuit.controllable_inputs().map(|i| i.literal).collect();
        let u: Vec<_> = circuit.uncontrollable_inputs().map(|i| i.literal).collect();
        assert_eq!(c, [Literal::new(2)]);
        assert_eq!(u, [Literal::new(4)]);
    }

    #[test]
    fn test_reject_binary() {
        let err = "aig 0 0 0 0 0\n".parse::<Circuit>().unwrap_err();
        assert!(matches!(err, AigerError::Parse(_)));
    }

    #[test]
    fn test_reject_truncated() {
        let err = "aag 2 2 0 0 0\n2\n".parse::<Circuit>().unwrap_err();
        assert!(matches!(err, AigerError::Parse(_)));
    }

    #[test]
    fn test_reject_odd_definition() {
        let err = "aag 1 1 0 0 0\n3\n".parse::<Circuit>().unwrap_err();
        assert!(matches!(
            err,
            AigerError::Parse(_) | AigerError::InvalidLiteral { .. }
        ));
    }

    #[test]
    fn test_reject_nonzero_reset() {
        let err = "aag 1 0 1 0 0\n2 3 1\n".parse::<Circuit>().unwrap_err();
        assert!(matches!(err, AigerError::Unsupported(_)));
    }

    #[test]
    fn test_reject_bad_state_section() {
        let err = "aag 1 1 0 0 0 1\n2\n2\n".parse::<Circuit>().unwrap_err();
        assert!(matches!(err, AigerError::Unsupported(_)));
    }

    #[test]
    fn test_reject_cycle() {
        let err = "aag 3 1 0 0 2\n2\n4 2 6\n6 2 4\n".parse::<Circuit>().unwrap_err();
        assert!(matches!(err, AigerError::Cycle(_) | AigerError::Parse(_)));
    }

    #[test]
    fn test_reject_huge_maxvar() {
        let text = "aag 2147483647 1 0 1 0\n2\n3\ni0 controllable_c\n";
        let err = text.parse::<Circuit>().unwrap_err();
        assert!(matches!(err, AigerError::Unsupported(_)));
    }

    #[test]
    fn test_fresh_literals_grow() {
        let mut circuit: Circuit = TOGGLE.parse().unwrap();
        let a = circuit.fresh_literal().unwrap();
        let b = circuit.add_and(Literal::new(2), Literal::new(5)).unwrap();
        assert_eq!(a, Literal::new(8));
        assert_eq!(b, Literal::new(10));
        assert_eq!(circuit.maxvar(), 5);
    }

    #[test]
    fn test_fresh_literal_limit() {
        let mut circuit = Circuit {
            maxvar: MAX_VARIABLE - 1,
            ..Circuit::default()
        };
        let last = circuit.fresh_literal().unwrap();
        assert_eq!(last.variable(), MAX_VARIABLE);
        let err = circuit.fresh_literal().unwrap_err();
        assert!(matches!(err, AigerError::Unsupported(_)));
        let err = circuit.add_and(last, last).unwrap_err();
        assert!(matches!(err, AigerError::Unsupported(_)));
        assert_eq!(circuit.maxvar(), MAX_VARIABLE);
        assert!(circuit.ands().is_empty());
    }

    #[test]
    fn test_redefine_input() {
        let mut circuit: Circuit = TOGGLE.parse().unwrap();
        circuit
            .redefine_input_as_and(Literal::new(2), Literal::new(5), Literal::new(5))
            .unwrap();
        assert!(circuit.inputs().is_empty());
        assert_eq!(circuit.definition(Literal::new(2)), Some(Definition::And(1)));

        let reread: Circuit = circuit.to_string().parse().unwrap();
        assert!(reread.inputs().is_empty());
        assert_eq!(reread.ands().len(), 2);
        let gate = reread.and_gate(Literal::new(2)).copied().unwrap();
        assert_eq!((gate.rhs0, gate.rhs1), (Literal::new(5), Literal::new(5)));

        let err = circuit.redefine_input_as_and(Literal::new(4), Literal::FALSE, Literal::FALSE);
        assert!(matches!(err, Err(AigerError::NotAnInput(_))));
    }
}
