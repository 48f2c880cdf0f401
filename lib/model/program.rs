use crate::model::{Function, FunctionId};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A linked set of functions.
///
/// Functions are addressed by `FunctionId`. A function which calls itself, or
/// functions which call each other, are created by first declaring their ids
/// and then defining them. Once defined, a function never changes.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Program {
    functions: Vec<Option<Function>>,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    /// Reserve an id for a function which will be defined later.
    pub fn declare(&mut self) -> FunctionId {
        self.functions.push(None);
        FunctionId::new(self.functions.len() - 1)
    }

    /// Define a previously declared function.
    pub fn define(&mut self, id: FunctionId, function: Function) -> Result<(), Error> {
        match self.functions.get_mut(id.index()) {
            Some(slot) => {
                if slot.is_some() {
                    return Err(Error::Redefinition(id));
                }
                *slot = Some(function);
                Ok(())
            }
            None => Err(Error::UnknownFunction(id)),
        }
    }

    /// Declare and define a function in one step.
    pub fn add(&mut self, function: Function) -> FunctionId {
        self.functions.push(Some(function));
        FunctionId::new(self.functions.len() - 1)
    }

    /// Get the function with the given id. An id which was declared but never
    /// defined is `Error::UndefinedFunction`, and an id from another program
    /// is `Error::UnknownFunction`.
    pub fn function(&self, id: FunctionId) -> Result<&Function, Error> {
        match self.functions.get(id.index()) {
            Some(Some(function)) => Ok(function),
            Some(None) => Err(Error::UndefinedFunction(id)),
            None => Err(Error::UnknownFunction(id)),
        }
    }

    /// Every defined function, with its id.
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(index, function)| {
                function.as_ref().map(|function| (FunctionId::new(index), function))
            })
    }

    /// The number of declared functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (id, function) in self.functions() {
            writeln!(f, "{}: {}", id, function)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Method, Node, Value};

    fn identity() -> Function {
        Function::new(
            Some("identity"),
            vec![],
            vec![Method::new(Node::literal(Value::Boolean(true)), Node::variable("a")).into()],
        )
    }

    #[test]
    fn declare_then_define() {
        let mut program = Program::new();
        let id = program.declare();

        assert!(matches!(program.function(id), Err(Error::UndefinedFunction(_))));

        program.define(id, identity()).unwrap();
        assert_eq!(program.function(id).unwrap().name(), Some("identity"));

        assert!(matches!(
            program.define(id, identity()),
            Err(Error::Redefinition(_))
        ));
    }

    #[test]
    fn define_unknown_id() {
        let mut program = Program::new();
        assert!(matches!(
            program.define(FunctionId::new(3), identity()),
            Err(Error::UnknownFunction(_))
        ));
        assert!(matches!(
            program.function(FunctionId::new(3)),
            Err(Error::UnknownFunction(_))
        ));
    }

    #[test]
    fn functions_skips_undefined() {
        let mut program = Program::new();
        program.declare();
        let id = program.add(identity());

        let defined: Vec<FunctionId> = program.functions().map(|(id, _)| id).collect();
        assert_eq!(defined, vec![id]);
        assert_eq!(program.len(), 2);
    }
}
