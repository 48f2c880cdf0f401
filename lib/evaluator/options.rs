use std::default;

/// Various options that can be passed to the evaluator. Options bound the
/// work the evaluator is willing to do.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Options {
    max_iterations: Option<usize>,
    max_depth: Option<usize>,
}

impl Options {
    /// Create a new set of Options with the default settings.
    pub fn new() -> Options {
        Options::default()
    }

    /// Set the maximum number of fixed point iterations for a single call.
    pub fn set_max_iterations(&mut self, max_iterations: Option<usize>) {
        self.max_iterations = max_iterations;
    }

    /// The maximum number of times the methods of a single call are
    /// re-evaluated while searching for a fixed point.
    ///
    /// Termination of the fixed point is only guaranteed when the domain has
    /// no infinite ascending chains for the given inputs. Over domains such as
    /// `FiniteSet`, a recursive function may never stabilize, and this limit
    /// turns that into `Error::FixpointLimit`. By default there is no limit.
    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    /// Set the maximum nesting depth of calls.
    pub fn set_max_depth(&mut self, max_depth: Option<usize>) {
        self.max_depth = max_depth;
    }

    /// The maximum number of nested calls which may be in progress at once.
    /// Exceeding it is `Error::RecursionLimit`. By default there is no limit.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }
}

/// Create your options with the builder pattern.
///
/// For more details on the options, see `evaluator::Options`
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder for evaluator options.
    pub fn new() -> OptionsBuilder {
        OptionsBuilder {
            options: Options::default(),
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> OptionsBuilder {
        self.options.set_max_iterations(Some(max_iterations));
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> OptionsBuilder {
        self.options.set_max_depth(Some(max_depth));
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

impl default::Default for OptionsBuilder {
    fn default() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}
