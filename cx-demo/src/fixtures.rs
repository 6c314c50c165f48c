//! Hand-built `TranslationUnit` fixtures standing in for parser output.

use cx_ast::{
    Access, Block, DeclId, Expression, Function, Item, Param, Program, SourceToken, Statement,
    SwitchCase, SymbolTable, TemplateRegistry, TranslationUnit, Type,
};

pub fn build(name: &str) -> anyhow::Result<TranslationUnit> {
    let program = match name {
        "return_literal" => Program { items: vec![Item::Function(return_literal())] },
        "loop_break" => Program { items: vec![Item::Function(loop_break())] },
        other => anyhow::bail!("unknown fixture `{other}` (expected `return_literal` or `loop_break`)"),
    };
    Ok(TranslationUnit { program, symbols: SymbolTable::new(), templates: TemplateRegistry::default() })
}

/// `int main() { return 42; }`
fn return_literal() -> Function {
    let token = SourceToken::unknown();
    Function {
        id: DeclId(0),
        name: "main".into(),
        owner_struct: None,
        type_params: Vec::new(),
        params: Vec::new(),
        return_type: Type::I32,
        body: Some(Block { statements: vec![Statement::Return(Some(Expression::IntLiteral(42)), token)] }),
        is_virtual: false,
        is_override: false,
        is_final: false,
        is_static: false,
        is_explicit: false,
        is_constructor: false,
        is_destructor: false,
        access: Access::Public,
        operator: None,
        token,
    }
}

/// ```cpp
/// int count() {
///     int total = 0;
///     for (int i = 0; i < 10; i = i + 1) {
///         switch (i) {
///             case 5: break;
///             default: total = total + i;
///         }
///     }
///     return total;
/// }
/// ```
/// Exercises the `break`-targets-nearest-switch-not-loop path (see S7).
fn loop_break() -> Function {
    let token = SourceToken::unknown();
    let init = Statement::VarDecl {
        name: "i".into(),
        ty: Type::I32,
        init: Some(Expression::IntLiteral(0)),
        token,
    };
    let condition = Expression::Binary {
        op: cx_ast::BinaryOp::Lt,
        lhs: Box::new(Expression::Ident("i".into())),
        rhs: Box::new(Expression::IntLiteral(10)),
        token,
    };
    let step = Expression::Assign {
        target: Box::new(Expression::Ident("i".into())),
        value: Box::new(Expression::Binary {
            op: cx_ast::BinaryOp::Add,
            lhs: Box::new(Expression::Ident("i".into())),
            rhs: Box::new(Expression::IntLiteral(1)),
            token,
        }),
    };
    let switch = Statement::Switch {
        value: Expression::Ident("i".into()),
        cases: vec![
            SwitchCase { value: Some(5), body: vec![Statement::Break] },
            SwitchCase {
                value: None,
                body: vec![Statement::Expression(Expression::Assign {
                    target: Box::new(Expression::Ident("total".into())),
                    value: Box::new(Expression::Binary {
                        op: cx_ast::BinaryOp::Add,
                        lhs: Box::new(Expression::Ident("total".into())),
                        rhs: Box::new(Expression::Ident("i".into())),
                        token,
                    }),
                })],
            },
        ],
    };
    let for_loop = Statement::For {
        init: Some(Box::new(init)),
        condition: Some(condition),
        step: Some(step),
        body: Box::new(Statement::Block(Block { statements: vec![switch] })),
    };
    let total_decl = Statement::VarDecl {
        name: "total".into(),
        ty: Type::I32,
        init: Some(Expression::IntLiteral(0)),
        token,
    };
    let body = Block {
        statements: vec![
            total_decl,
            for_loop,
            Statement::Return(Some(Expression::Ident("total".into())), token),
        ],
    };

    Function {
        id: DeclId(1),
        name: "count".into(),
        owner_struct: None,
        type_params: Vec::new(),
        params: Vec::<Param>::new(),
        return_type: Type::I32,
        body: Some(body),
        is_virtual: false,
        is_override: false,
        is_final: false,
        is_static: false,
        is_explicit: false,
        is_constructor: false,
        is_destructor: false,
        access: Access::Public,
        operator: None,
        token,
    }
}
