//! Generic Mamdani-style fuzzy inference.
//!
//! The engine is domain-agnostic: trapezoidal membership sets live in a
//! single arena owned by the model and are referenced by interned ids;
//! antecedents are tagged expression trees; defuzzification is a centroid
//! over a discretely sampled output universe. The impact rule base that
//! configures it lives in [`crate::rules`].

use crate::geometry::Scalar;
use std::fmt;

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Trapezoidal membership function over `a <= b <= c <= d`.
///
/// Degree is 0 outside `[a, d]`, 1 over `[b, c]`, and ramps linearly over
/// `[a, b]` and `[c, d]`. `a == b` or `c == d` gives a hard edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembershipSet {
    a: Scalar,
    b: Scalar,
    c: Scalar,
    d: Scalar,
}

impl MembershipSet {
    pub fn new(a: Scalar, b: Scalar, c: Scalar, d: Scalar) -> Self {
        debug_assert!(a <= b && b <= c && c <= d, "trapezoid corners out of order");
        Self { a, b, c, d }
    }

    /// Membership degree of a crisp value, in [0, 1].
    pub fn degree(&self, x: Scalar) -> Scalar {
        if x < self.a || x > self.d {
            return 0.0;
        }
        if x < self.b {
            return (x - self.a) / (self.b - self.a);
        }
        if x <= self.c {
            return 1.0;
        }
        (self.d - x) / (self.d - self.c)
    }
}

// ---------------------------------------------------------------------------
// Arena ids
// ---------------------------------------------------------------------------

/// Interned index of a membership set in the model arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetId(usize);

/// Index of an input variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetSource {
    Input(usize),
    Output,
}

#[derive(Debug, Clone, Copy)]
struct ArenaEntry {
    set: MembershipSet,
    source: SetSource,
}

// ---------------------------------------------------------------------------
// Antecedents & Rules
// ---------------------------------------------------------------------------

/// Boolean-expression tree over input-set membership degrees.
#[derive(Debug, Clone)]
pub enum Antecedent {
    /// Degree of a single input set.
    Ref(SetId),
    /// Minimum over children.
    And(Vec<Antecedent>),
    /// Maximum over children.
    Or(Vec<Antecedent>),
}

impl Antecedent {
    pub fn and(lhs: impl Into<Antecedent>, rhs: impl Into<Antecedent>) -> Self {
        Antecedent::And(vec![lhs.into(), rhs.into()])
    }

    pub fn or(lhs: impl Into<Antecedent>, rhs: impl Into<Antecedent>) -> Self {
        Antecedent::Or(vec![lhs.into(), rhs.into()])
    }

    fn eval(&self, degrees: &[Scalar]) -> Scalar {
        match self {
            Antecedent::Ref(id) => degrees[id.0],
            Antecedent::And(children) => children
                .iter()
                .map(|c| c.eval(degrees))
                .fold(1.0, Scalar::min),
            Antecedent::Or(children) => children
                .iter()
                .map(|c| c.eval(degrees))
                .fold(0.0, Scalar::max),
        }
    }

    fn validate(&self, arena: &[ArenaEntry], rule: u32) -> Result<(), ModelError> {
        match self {
            Antecedent::Ref(id) => match arena[id.0].source {
                SetSource::Input(_) => Ok(()),
                SetSource::Output => Err(ModelError::AntecedentRefsOutput { rule }),
            },
            Antecedent::And(children) | Antecedent::Or(children) => {
                if children.is_empty() {
                    return Err(ModelError::EmptyAntecedent { rule });
                }
                children.iter().try_for_each(|c| c.validate(arena, rule))
            }
        }
    }
}

impl From<SetId> for Antecedent {
    fn from(id: SetId) -> Self {
        Antecedent::Ref(id)
    }
}

/// A single inference rule: antecedent strength clips the consequent set.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: u32,
    when: Antecedent,
    then: SetId,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Rule-base configuration errors, reported at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    NoOutputSets,
    NoRules,
    EmptyAntecedent { rule: u32 },
    AntecedentRefsOutput { rule: u32 },
    ConsequentNotOutput { rule: u32 },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NoOutputSets => write!(f, "model has no output sets"),
            ModelError::NoRules => write!(f, "model has no rules"),
            ModelError::EmptyAntecedent { rule } => {
                write!(f, "rule {rule} has an empty antecedent branch")
            }
            ModelError::AntecedentRefsOutput { rule } => {
                write!(f, "rule {rule} antecedent references an output set")
            }
            ModelError::ConsequentNotOutput { rule } => {
                write!(f, "rule {rule} consequent is not an output set")
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// Immutable fuzzy model: set arena, input variables, one output variable
/// and the rule list. Built once via [`FuzzyModel::builder`], never mutated.
#[derive(Debug, Clone)]
pub struct FuzzyModel {
    arena: Vec<ArenaEntry>,
    inputs: Vec<&'static str>,
    output_name: &'static str,
    output_lo: Scalar,
    output_hi: Scalar,
    resolution: Scalar,
    rules: Vec<Rule>,
}

impl FuzzyModel {
    /// Start a model whose output variable spans `[lo, hi]`, defuzzified by
    /// centroid sampling at `resolution`.
    pub fn builder(
        output_name: &'static str,
        lo: Scalar,
        hi: Scalar,
        resolution: Scalar,
    ) -> FuzzyModelBuilder {
        debug_assert!(lo < hi && resolution > 0.0);
        FuzzyModelBuilder {
            arena: Vec::new(),
            inputs: Vec::new(),
            output_name,
            output_lo: lo,
            output_hi: hi,
            resolution,
            rules: Vec::new(),
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_names(&self) -> &[&'static str] {
        &self.inputs
    }

    pub fn output_name(&self) -> &'static str {
        self.output_name
    }

    /// One full inference pass over a crisp input vector.
    ///
    /// Fuzzifies every input set, evaluates each rule's antecedent tree,
    /// clips the fired consequents to their strengths, aggregates them by
    /// pointwise max and returns the centroid of the aggregate. An
    /// identically-zero aggregate defuzzifies to 0.
    pub fn infer(&self, crisp: &[Scalar]) -> Scalar {
        assert_eq!(crisp.len(), self.inputs.len(), "crisp input count mismatch");

        let degrees: Vec<Scalar> = self
            .arena
            .iter()
            .map(|entry| match entry.source {
                SetSource::Input(var) => entry.set.degree(crisp[var]),
                SetSource::Output => 0.0,
            })
            .collect();

        // Per-consequent clip level. Rules sharing a consequent combine by
        // max, which is equivalent to aggregating their clipped shapes.
        let mut clip = vec![0.0; self.arena.len()];
        for rule in &self.rules {
            let strength = rule.when.eval(&degrees);
            clip[rule.then.0] = Scalar::max(clip[rule.then.0], strength);
        }

        let steps = ((self.output_hi - self.output_lo) / self.resolution).round() as usize;
        let mut weighted = 0.0;
        let mut total = 0.0;
        for k in 0..=steps {
            let x = self.output_lo + k as Scalar * self.resolution;
            let mut mu: Scalar = 0.0;
            for (entry, level) in self.arena.iter().zip(&clip) {
                if entry.source == SetSource::Output && *level > 0.0 {
                    mu = mu.max(level.min(entry.set.degree(x)));
                }
            }
            weighted += x * mu;
            total += mu;
        }
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct FuzzyModelBuilder {
    arena: Vec<ArenaEntry>,
    inputs: Vec<&'static str>,
    output_name: &'static str,
    output_lo: Scalar,
    output_hi: Scalar,
    resolution: Scalar,
    rules: Vec<Rule>,
}

impl FuzzyModelBuilder {
    pub fn add_input(&mut self, name: &'static str) -> InputId {
        self.inputs.push(name);
        InputId(self.inputs.len() - 1)
    }

    /// Intern a membership set for an input variable.
    pub fn input_set(&mut self, input: InputId, set: MembershipSet) -> SetId {
        self.arena.push(ArenaEntry {
            set,
            source: SetSource::Input(input.0),
        });
        SetId(self.arena.len() - 1)
    }

    /// Intern a membership set for the output variable.
    pub fn output_set(&mut self, set: MembershipSet) -> SetId {
        self.arena.push(ArenaEntry {
            set,
            source: SetSource::Output,
        });
        SetId(self.arena.len() - 1)
    }

    pub fn rule(&mut self, id: u32, when: impl Into<Antecedent>, then: SetId) {
        self.rules.push(Rule {
            id,
            when: when.into(),
            then,
        });
    }

    pub fn build(self) -> Result<FuzzyModel, ModelError> {
        if !self
            .arena
            .iter()
            .any(|entry| entry.source == SetSource::Output)
        {
            return Err(ModelError::NoOutputSets);
        }
        if self.rules.is_empty() {
            return Err(ModelError::NoRules);
        }
        for rule in &self.rules {
            rule.when.validate(&self.arena, rule.id)?;
            if self.arena[rule.then.0].source != SetSource::Output {
                return Err(ModelError::ConsequentNotOutput { rule: rule.id });
            }
        }
        Ok(FuzzyModel {
            arena: self.arena,
            inputs: self.inputs,
            output_name: self.output_name,
            output_lo: self.output_lo,
            output_hi: self.output_hi,
            resolution: self.resolution,
            rules: self.rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trapezoid_degrees() {
        let set = MembershipSet::new(0.0, 2.0, 4.0, 6.0);
        assert_eq!(set.degree(-0.5), 0.0);
        assert_eq!(set.degree(1.0), 0.5);
        assert_eq!(set.degree(2.0), 1.0);
        assert_eq!(set.degree(3.0), 1.0);
        assert_eq!(set.degree(4.0), 1.0);
        assert_eq!(set.degree(5.0), 0.5);
        assert_eq!(set.degree(6.5), 0.0);
    }

    #[test]
    fn test_trapezoid_hard_edges() {
        // a == b: full membership right at the left corner.
        let left = MembershipSet::new(0.0, 0.0, 0.5, 1.5);
        assert_eq!(left.degree(0.0), 1.0);
        // c == d: full membership right at the right corner.
        let right = MembershipSet::new(4.0, 6.0, 10.0, 10.0);
        assert_eq!(right.degree(10.0), 1.0);
        assert_eq!(right.degree(5.0), 0.5);
    }

    fn single_rule_model() -> FuzzyModel {
        // One input whose degree at a probe value x in [0, 1] equals x,
        // one symmetric triangular consequent centered at 0.3.
        let mut b = FuzzyModel::builder("out", -1.0, 1.0, 0.01);
        let input = b.add_input("x");
        let set = b.input_set(input, MembershipSet::new(0.0, 1.0, 1.0, 2.0));
        let consequent = b.output_set(MembershipSet::new(0.1, 0.3, 0.3, 0.5));
        b.rule(1, set, consequent);
        b.build().unwrap()
    }

    #[test]
    fn test_single_rule_centroid_is_center() {
        // A symmetric triangle clipped at any strength keeps its centroid.
        let model = single_rule_model();
        for crisp in [0.25_f32, 0.5, 1.0] {
            let out = model.infer(&[crisp]);
            assert!(
                (out - 0.3).abs() < 1e-3,
                "centroid {out} should be 0.3 at strength {crisp}"
            );
        }
    }

    #[test]
    fn test_no_fired_rules_defuzzifies_to_zero() {
        let model = single_rule_model();
        assert_eq!(model.infer(&[-5.0]), 0.0);
    }

    #[test]
    fn test_and_or_evaluation() {
        let mut b = FuzzyModel::builder("out", 0.0, 1.0, 0.01);
        let x = b.add_input("x");
        let y = b.add_input("y");
        // Degrees at probe (0.5, 0.25): sx = 0.5, sy = 0.25.
        let sx = b.input_set(x, MembershipSet::new(0.0, 1.0, 1.0, 1.0));
        let sy = b.input_set(y, MembershipSet::new(0.0, 1.0, 1.0, 1.0));
        let lo = b.output_set(MembershipSet::new(0.0, 0.2, 0.2, 0.4));
        let hi = b.output_set(MembershipSet::new(0.6, 0.8, 0.8, 1.0));
        b.rule(1, Antecedent::and(sx, sy), lo);
        b.rule(2, Antecedent::or(sx, sy), hi);
        let model = b.build().unwrap();

        // AND clips `lo` at 0.25, OR clips `hi` at 0.5. The centroid must
        // land between the two triangle centers, nearer the stronger one.
        let out = model.infer(&[0.5, 0.25]);
        assert!(out > 0.5 && out < 0.8, "got {out}");
    }

    #[test]
    fn test_builder_rejects_output_ref_in_antecedent() {
        let mut b = FuzzyModel::builder("out", -1.0, 1.0, 0.01);
        let _input = b.add_input("x");
        let out_set = b.output_set(MembershipSet::new(-0.5, 0.0, 0.0, 0.5));
        b.rule(1, out_set, out_set);
        assert_eq!(
            b.build().unwrap_err(),
            ModelError::AntecedentRefsOutput { rule: 1 }
        );
    }

    #[test]
    fn test_builder_rejects_input_consequent() {
        let mut b = FuzzyModel::builder("out", -1.0, 1.0, 0.01);
        let input = b.add_input("x");
        let in_set = b.input_set(input, MembershipSet::new(0.0, 1.0, 1.0, 2.0));
        let _out_set = b.output_set(MembershipSet::new(-0.5, 0.0, 0.0, 0.5));
        b.rule(7, in_set, in_set);
        assert_eq!(
            b.build().unwrap_err(),
            ModelError::ConsequentNotOutput { rule: 7 }
        );
    }

    #[test]
    fn test_builder_rejects_empty_model() {
        let b = FuzzyModel::builder("out", -1.0, 1.0, 0.01);
        assert_eq!(b.build().unwrap_err(), ModelError::NoOutputSets);
    }
}
