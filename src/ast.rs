//! Syntax tree produced by the parser and walked by the interpreter.
//!
//! Every node carries an optional [`Position`]. The parser leaves positions
//! out in testing mode so trees built with the constructors below compare
//! equal to parsed ones.

use crate::{diagnostics::Position, lexer::Operator};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Node>,
}

impl Program {
    pub fn new(statements: Vec<Node>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub elements: Vec<Node>,
}

impl Block {
    pub fn new(elements: Vec<Node>) -> Self {
        Self { elements }
    }
}

/// A function parameter: positional, or bound to the caller's trailing block.
#[derive(Debug, Clone, PartialEq)]
pub enum FuncArg {
    Var(String),
    Block(String),
}

impl FuncArg {
    pub fn var(name: impl Into<String>) -> Self {
        FuncArg::Var(name.into())
    }

    pub fn block(name: impl Into<String>) -> Self {
        FuncArg::Block(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            FuncArg::Var(name) | FuncArg::Block(name) => name,
        }
    }
}

/// An anonymous function literal; only produced as a call's trailing block.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub args: Vec<FuncArg>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub predicate: Node,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Loop {
        count: Box<Node>,
        block: Block,
        loop_var: Option<String>,
    },
    Assignment {
        identifier: String,
        expression: Box<Node>,
    },
    ConditionalAssignment {
        identifier: String,
        expression: Box<Node>,
    },
    If {
        conditionals: Vec<Conditional>,
    },
    Lambda(Lambda),
    Func {
        name: String,
        args: Vec<FuncArg>,
        body: Block,
    },
    Application {
        name: String,
        args: Vec<Node>,
        lambda: Option<Lambda>,
    },
    BinaryOp {
        operator: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp {
        operator: Operator,
        expr: Box<Node>,
    },
    Variable(String),
    Index {
        collection: Box<Node>,
        index: Box<Node>,
    },
    Num(f64),
    Null,
    Symbol(String),
    List(Vec<Node>),
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }

    /// Attaches a source position; `None` leaves the node unpositioned.
    pub fn at(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    pub fn loop_(count: Node, block: Block, loop_var: Option<&str>) -> Self {
        Self::new(NodeKind::Loop {
            count: Box::new(count),
            block,
            loop_var: loop_var.map(str::to_string),
        })
    }

    pub fn assignment(identifier: impl Into<String>, expression: Node) -> Self {
        Self::new(NodeKind::Assignment {
            identifier: identifier.into(),
            expression: Box::new(expression),
        })
    }

    pub fn conditional_assignment(identifier: impl Into<String>, expression: Node) -> Self {
        Self::new(NodeKind::ConditionalAssignment {
            identifier: identifier.into(),
            expression: Box::new(expression),
        })
    }

    pub fn if_(conditionals: Vec<(Node, Block)>) -> Self {
        Self::new(NodeKind::If {
            conditionals: conditionals
                .into_iter()
                .map(|(predicate, block)| Conditional { predicate, block })
                .collect(),
        })
    }

    pub fn lambda(args: Vec<FuncArg>, body: Block) -> Self {
        Self::new(NodeKind::Lambda(Lambda { args, body }))
    }

    pub fn func(name: impl Into<String>, args: Vec<FuncArg>, body: Block) -> Self {
        Self::new(NodeKind::Func {
            name: name.into(),
            args,
            body,
        })
    }

    pub fn application(name: impl Into<String>, args: Vec<Node>) -> Self {
        Self::new(NodeKind::Application {
            name: name.into(),
            args,
            lambda: None,
        })
    }

    pub fn application_with_block(
        name: impl Into<String>,
        args: Vec<Node>,
        lambda_args: Vec<FuncArg>,
        body: Block,
    ) -> Self {
        Self::new(NodeKind::Application {
            name: name.into(),
            args,
            lambda: Some(Lambda {
                args: lambda_args,
                body,
            }),
        })
    }

    pub fn binary_op(operator: Operator, left: Node, right: Node) -> Self {
        Self::new(NodeKind::BinaryOp {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary_op(operator: Operator, expr: Node) -> Self {
        Self::new(NodeKind::UnaryOp {
            operator,
            expr: Box::new(expr),
        })
    }

    pub fn variable(identifier: impl Into<String>) -> Self {
        Self::new(NodeKind::Variable(identifier.into()))
    }

    pub fn index(collection: Node, index: Node) -> Self {
        Self::new(NodeKind::Index {
            collection: Box::new(collection),
            index: Box::new(index),
        })
    }

    pub fn num(value: f64) -> Self {
        Self::new(NodeKind::Num(value))
    }

    pub fn null() -> Self {
        Self::new(NodeKind::Null)
    }

    pub fn symbol(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Symbol(value.into()))
    }

    pub fn list(values: Vec<Node>) -> Self {
        Self::new(NodeKind::List(values))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, NodeKind::Null)
    }

    /// Copy of the tree with every position cleared.
    pub fn without_positions(&self) -> Node {
        let kind = match &self.kind {
            NodeKind::Loop {
                count,
                block,
                loop_var,
            } => NodeKind::Loop {
                count: Box::new(count.without_positions()),
                block: strip_block(block),
                loop_var: loop_var.clone(),
            },
            NodeKind::Assignment {
                identifier,
                expression,
            } => NodeKind::Assignment {
                identifier: identifier.clone(),
                expression: Box::new(expression.without_positions()),
            },
            NodeKind::ConditionalAssignment {
                identifier,
                expression,
            } => NodeKind::ConditionalAssignment {
                identifier: identifier.clone(),
                expression: Box::new(expression.without_positions()),
            },
            NodeKind::If { conditionals } => NodeKind::If {
                conditionals: conditionals
                    .iter()
                    .map(|c| Conditional {
                        predicate: c.predicate.without_positions(),
                        block: strip_block(&c.block),
                    })
                    .collect(),
            },
            NodeKind::Lambda(lambda) => NodeKind::Lambda(strip_lambda(lambda)),
            NodeKind::Func { name, args, body } => NodeKind::Func {
                name: name.clone(),
                args: args.clone(),
                body: strip_block(body),
            },
            NodeKind::Application { name, args, lambda } => NodeKind::Application {
                name: name.clone(),
                args: args.iter().map(Node::without_positions).collect(),
                lambda: lambda.as_ref().map(strip_lambda),
            },
            NodeKind::BinaryOp {
                operator,
                left,
                right,
            } => NodeKind::BinaryOp {
                operator: *operator,
                left: Box::new(left.without_positions()),
                right: Box::new(right.without_positions()),
            },
            NodeKind::UnaryOp { operator, expr } => NodeKind::UnaryOp {
                operator: *operator,
                expr: Box::new(expr.without_positions()),
            },
            NodeKind::Index { collection, index } => NodeKind::Index {
                collection: Box::new(collection.without_positions()),
                index: Box::new(index.without_positions()),
            },
            NodeKind::List(values) => {
                NodeKind::List(values.iter().map(Node::without_positions).collect())
            }
            other => other.clone(),
        };
        Node::new(kind)
    }
}

impl Program {
    pub fn without_positions(&self) -> Program {
        Program::new(self.statements.iter().map(Node::without_positions).collect())
    }
}

fn strip_block(block: &Block) -> Block {
    Block::new(block.elements.iter().map(Node::without_positions).collect())
}

fn strip_lambda(lambda: &Lambda) -> Lambda {
    Lambda {
        args: lambda.args.clone(),
        body: strip_block(&lambda.body),
    }
}
