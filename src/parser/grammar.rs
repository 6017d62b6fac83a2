//! Parser implementation using chumsky

use chumsky::input::{Input, Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::{tokenize, Delims, Lexeme, Token};

/// Parse template source into a body of nodes
pub fn parse(input: &str, delims: &Delims) -> Result<Body, Vec<crate::ParseError>> {
    let len = input.len();
    let lexemes = tokenize(input, delims)?;

    let token_iter = lexemes
        .into_iter()
        .map(|(tok, span)| (tok, SimpleSpan::from(span)));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Lexeme, SimpleSpan) into token and span parts
        .spanned::<Lexeme, SimpleSpan>((len..len).into());

    body_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn action<'a, I>(token: Token) -> impl Parser<'a, I, Lexeme, extra::Err<Rich<'a, Lexeme>>> + Clone
where
    I: ValueInput<'a, Token = Lexeme, Span = SimpleSpan>,
{
    just(Lexeme::Action(token))
}

fn open<'a, I>() -> impl Parser<'a, I, Lexeme, extra::Err<Rich<'a, Lexeme>>> + Clone
where
    I: ValueInput<'a, Token = Lexeme, Span = SimpleSpan>,
{
    just(Lexeme::Open)
}

fn close<'a, I>() -> impl Parser<'a, I, Lexeme, extra::Err<Rich<'a, Lexeme>>> + Clone
where
    I: ValueInput<'a, Token = Lexeme, Span = SimpleSpan>,
{
    just(Lexeme::Close)
}

/// Split a `$name.Field.Sub` token into name and field chain
fn variable_operand(raw: &str) -> Operand {
    let mut parts = raw.split('.');
    let name = parts.next().unwrap_or("$").to_string();
    Operand::Variable {
        name,
        fields: parts.map(str::to_string).collect(),
    }
}

fn pipeline_parser<'a, I>() -> impl Parser<'a, I, Pipeline, extra::Err<Rich<'a, Lexeme>>> + Clone
where
    I: ValueInput<'a, Token = Lexeme, Span = SimpleSpan>,
{
    recursive(|pipeline| {
        let atom = select! {
            Lexeme::Action(Token::Dot) => Operand::Dot,
            Lexeme::Action(Token::Field(path)) => Operand::Field(path),
            Lexeme::Action(Token::Variable(raw)) => variable_operand(&raw),
            Lexeme::Action(Token::Ident(name)) => Operand::Function(name),
            Lexeme::Action(Token::String(s)) => Operand::Literal(serde_json::Value::String(s)),
            Lexeme::Action(Token::RawString(s)) => Operand::Literal(serde_json::Value::String(s)),
            Lexeme::Action(Token::Int(n)) => Operand::Literal(serde_json::Value::from(n)),
            Lexeme::Action(Token::Float(n)) => Operand::Literal(
                serde_json::Number::from_f64(n)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            ),
            Lexeme::Action(Token::True) => Operand::Literal(serde_json::Value::Bool(true)),
            Lexeme::Action(Token::False) => Operand::Literal(serde_json::Value::Bool(false)),
            Lexeme::Action(Token::Nil) => Operand::Literal(serde_json::Value::Null),
        };

        let operand = choice((
            atom,
            pipeline
                .delimited_by(action(Token::ParenOpen), action(Token::ParenClose))
                .map(|p: Pipeline| Operand::Pipeline(Box::new(p))),
        ))
        .map_with(|op, e| Spanned::new(op, span_range(&e.span())));

        // A command is a function call with arguments or a single operand
        let command = operand
            .repeated()
            .at_least(1)
            .collect::<Vec<_>>()
            .try_map(|args: Vec<Spanned<Operand>>, span: SimpleSpan| {
                if args.len() > 1 && !matches!(args[0].node, Operand::Function(_)) {
                    return Err(Rich::custom(
                        span,
                        format!("can't give argument to non-function {}", args[0].node),
                    ));
                }
                Ok(Command { args })
            })
            .map_with(|cmd, e| Spanned::new(cmd, span_range(&e.span())));

        let variable_name = select! {
            Lexeme::Action(Token::Variable(raw)) => raw,
        }
        .try_map(|raw: String, span: SimpleSpan| {
            if raw.contains('.') {
                Err(Rich::custom(span, format!("cannot declare field chain {}", raw)))
            } else {
                Ok(raw)
            }
        })
        .map_with(|name, e| Spanned::new(name, span_range(&e.span())));

        // Declaration: `$x :=` or `$i, $e :=`
        let declaration = variable_name
            .separated_by(action(Token::Comma))
            .at_least(1)
            .at_most(2)
            .collect::<Vec<_>>()
            .then_ignore(action(Token::Declare));

        declaration
            .or_not()
            .then(
                command
                    .separated_by(action(Token::Pipe))
                    .at_least(1)
                    .collect::<Vec<_>>(),
            )
            .try_map(|(decl, commands): (Option<Vec<_>>, Vec<Spanned<Command>>), span: SimpleSpan| {
                // Every stage after the first receives the previous result as an argument
                if let Some(stage) = commands.iter().skip(1).find(|c| c.node.function().is_none()) {
                    return Err(Rich::custom(
                        span,
                        format!("non executable command in pipeline: {}", stage.node.args[0].node),
                    ));
                }
                Ok(Pipeline {
                    decl: decl.unwrap_or_default(),
                    commands,
                })
            })
            .boxed()
    })
}

fn body_parser<'a, I>() -> impl Parser<'a, I, Body, extra::Err<Rich<'a, Lexeme>>> + Clone
where
    I: ValueInput<'a, Token = Lexeme, Span = SimpleSpan>,
{
    let pipeline = pipeline_parser();

    let end_action = open().then(action(Token::End)).then(close());

    recursive(|body| {
        let text = select! {
            Lexeme::Text(s) => Node::Text(s),
        };

        // `{{else}} body`
        let else_branch = open()
            .then(action(Token::Else))
            .then(close())
            .ignore_then(body.clone());

        // `{{else if pipeline}} body`
        let else_if = open()
            .then(action(Token::Else))
            .then(action(Token::If))
            .ignore_then(pipeline.clone())
            .then_ignore(close())
            .then(body.clone());

        let if_node = open()
            .then(action(Token::If))
            .ignore_then(pipeline.clone())
            .then_ignore(close())
            .then(body.clone())
            .then(else_if.repeated().collect::<Vec<_>>())
            .then(else_branch.clone().or_not())
            .then_ignore(end_action.clone())
            .map(|(((cond, then), else_ifs), otherwise)| {
                let mut branches = vec![(cond, then)];
                branches.extend(else_ifs);
                Node::If { branches, otherwise }
            });

        let range_node = open()
            .then(action(Token::Range))
            .ignore_then(pipeline.clone())
            .then_ignore(close())
            .then(body.clone())
            .then(else_branch.clone().or_not())
            .then_ignore(end_action.clone())
            .map(|((pipeline, body), otherwise)| Node::Range {
                pipeline,
                body,
                otherwise,
            });

        let with_node = open()
            .then(action(Token::With))
            .ignore_then(pipeline.clone())
            .then_ignore(close())
            .then(body.clone())
            .then(else_branch.or_not())
            .then_ignore(end_action.clone())
            .map(|((pipeline, body), otherwise)| Node::With {
                pipeline,
                body,
                otherwise,
            });

        let template_name = select! {
            Lexeme::Action(Token::String(s)) => s,
            Lexeme::Action(Token::RawString(s)) => s,
        };

        let include = open()
            .then(action(Token::Template))
            .ignore_then(template_name)
            .then(pipeline.clone().or_not())
            .then_ignore(close())
            .map(|(name, pipeline)| Node::Include { name, pipeline });

        let output = open()
            .ignore_then(pipeline.clone())
            .then_ignore(close())
            .map(Node::Action);

        // Control actions before plain output so keywords are not
        // reported as bad operands
        choice((text, if_node, range_node, with_node, include, output))
            .map_with(|node, e| Spanned::new(node, span_range(&e.span())))
            .repeated()
            .collect::<Vec<_>>()
            .boxed()
    })
}
