// SPDX-License-Identifier: Apache-2.0

//! Structural helpers over `NodePayload`.

use crate::ast::{NodePayload, NodeRef};

/// Returns the child references of `payload` in field order.
pub fn children(payload: &NodePayload) -> Vec<NodeRef> {
    let mut out = Vec::new();
    remap_payload_with(payload, |r| {
        out.push(r);
        r
    });
    out
}

fn map_vec<F: FnMut(NodeRef) -> NodeRef>(v: &[NodeRef], map: &mut F) -> Vec<NodeRef> {
    v.iter().map(|r| map(*r)).collect()
}

fn map_opt<F: FnMut(NodeRef) -> NodeRef>(v: &Option<NodeRef>, map: &mut F) -> Option<NodeRef> {
    v.map(|r| map(r))
}

/// Returns a copy of `payload` with every child reference passed through
/// `map`. Children are visited in field order, which is also the order used
/// for pre-order traversal.
pub fn remap_payload_with<F>(payload: &NodePayload, mut map: F) -> NodePayload
where
    F: FnMut(NodeRef) -> NodeRef,
{
    use NodePayload::*;
    let m = &mut map;
    match payload {
        Module { body } => Module {
            body: map_vec(body, m),
        },
        FunctionDef {
            name,
            args,
            body,
            decorators,
            returns,
            is_async,
        } => {
            let args = m(*args);
            let body = map_vec(body, m);
            let decorators = map_vec(decorators, m);
            let returns = map_opt(returns, m);
            FunctionDef {
                name: name.clone(),
                args,
                body,
                decorators,
                returns,
                is_async: *is_async,
            }
        }
        ClassDef {
            name,
            bases,
            keywords,
            body,
            decorators,
        } => {
            let bases = map_vec(bases, m);
            let keywords = map_vec(keywords, m);
            let body = map_vec(body, m);
            let decorators = map_vec(decorators, m);
            ClassDef {
                name: name.clone(),
                bases,
                keywords,
                body,
                decorators,
            }
        }
        Return { value } => Return {
            value: map_opt(value, m),
        },
        Delete { targets } => Delete {
            targets: map_vec(targets, m),
        },
        Assign { targets, value } => {
            let targets = map_vec(targets, m);
            let value = m(*value);
            Assign { targets, value }
        }
        AugAssign { target, op, value } => {
            let target = m(*target);
            let value = m(*value);
            AugAssign {
                target,
                op: *op,
                value,
            }
        }
        AnnAssign {
            target,
            annotation,
            value,
            simple,
        } => {
            let target = m(*target);
            let annotation = m(*annotation);
            let value = map_opt(value, m);
            AnnAssign {
                target,
                annotation,
                value,
                simple: *simple,
            }
        }
        For {
            target,
            iter,
            body,
            orelse,
            is_async,
        } => {
            let target = m(*target);
            let iter = m(*iter);
            let body = map_vec(body, m);
            let orelse = map_vec(orelse, m);
            For {
                target,
                iter,
                body,
                orelse,
                is_async: *is_async,
            }
        }
        While { test, body, orelse } => {
            let test = m(*test);
            let body = map_vec(body, m);
            let orelse = map_vec(orelse, m);
            While { test, body, orelse }
        }
        If { test, body, orelse } => {
            let test = m(*test);
            let body = map_vec(body, m);
            let orelse = map_vec(orelse, m);
            If { test, body, orelse }
        }
        With {
            items,
            body,
            is_async,
        } => {
            let items = map_vec(items, m);
            let body = map_vec(body, m);
            With {
                items,
                body,
                is_async: *is_async,
            }
        }
        Raise { exc, cause } => {
            let exc = map_opt(exc, m);
            let cause = map_opt(cause, m);
            Raise { exc, cause }
        }
        Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            let body = map_vec(body, m);
            let handlers = map_vec(handlers, m);
            let orelse = map_vec(orelse, m);
            let finalbody = map_vec(finalbody, m);
            Try {
                body,
                handlers,
                orelse,
                finalbody,
            }
        }
        Assert { test, msg } => {
            let test = m(*test);
            let msg = map_opt(msg, m);
            Assert { test, msg }
        }
        Import { .. }
        | ImportFrom { .. }
        | Global { .. }
        | Nonlocal { .. }
        | Pass
        | Break
        | Continue
        | Comment { .. }
        | Constant { .. }
        | Name { .. } => payload.clone(),
        Expr { value } => Expr { value: m(*value) },
        StatementGroup { body } => StatementGroup {
            body: map_vec(body, m),
        },
        TrailingComment { stmt, text } => TrailingComment {
            stmt: m(*stmt),
            text: text.clone(),
        },
        SimpleLine { body } => SimpleLine {
            body: map_vec(body, m),
        },
        BoolOp { op, values } => BoolOp {
            op: *op,
            values: map_vec(values, m),
        },
        NamedExpr { target, value } => {
            let target = m(*target);
            let value = m(*value);
            NamedExpr { target, value }
        }
        BinOp { left, op, right } => {
            let left = m(*left);
            let right = m(*right);
            BinOp {
                left,
                op: *op,
                right,
            }
        }
        UnaryOp { op, operand } => UnaryOp {
            op: *op,
            operand: m(*operand),
        },
        Lambda { args, body } => {
            let args = m(*args);
            let body = m(*body);
            Lambda { args, body }
        }
        IfExp { test, body, orelse } => {
            let test = m(*test);
            let body = m(*body);
            let orelse = m(*orelse);
            IfExp { test, body, orelse }
        }
        Dict { keys, values } => {
            let keys = keys.iter().map(|k| map_opt(k, m)).collect();
            let values = map_vec(values, m);
            Dict { keys, values }
        }
        Set { elts } => Set {
            elts: map_vec(elts, m),
        },
        ListComp { elt, generators } => {
            let elt = m(*elt);
            let generators = map_vec(generators, m);
            ListComp { elt, generators }
        }
        SetComp { elt, generators } => {
            let elt = m(*elt);
            let generators = map_vec(generators, m);
            SetComp { elt, generators }
        }
        GeneratorExp { elt, generators } => {
            let elt = m(*elt);
            let generators = map_vec(generators, m);
            GeneratorExp { elt, generators }
        }
        DictComp {
            key,
            value,
            generators,
        } => {
            let key = m(*key);
            let value = m(*value);
            let generators = map_vec(generators, m);
            DictComp {
                key,
                value,
                generators,
            }
        }
        Await { value } => Await { value: m(*value) },
        Yield { value } => Yield {
            value: map_opt(value, m),
        },
        YieldFrom { value } => YieldFrom { value: m(*value) },
        Compare {
            left,
            ops,
            comparators,
        } => {
            let left = m(*left);
            let comparators = map_vec(comparators, m);
            Compare {
                left,
                ops: ops.clone(),
                comparators,
            }
        }
        Call {
            func,
            args,
            keywords,
        } => {
            let func = m(*func);
            let args = map_vec(args, m);
            let keywords = map_vec(keywords, m);
            Call {
                func,
                args,
                keywords,
            }
        }
        FormattedValue {
            value,
            conversion,
            format_spec,
        } => {
            let value = m(*value);
            let format_spec = map_opt(format_spec, m);
            FormattedValue {
                value,
                conversion: *conversion,
                format_spec,
            }
        }
        JoinedStr { values } => JoinedStr {
            values: map_vec(values, m),
        },
        Attribute { value, attr } => Attribute {
            value: m(*value),
            attr: attr.clone(),
        },
        Subscript { value, slice } => {
            let value = m(*value);
            let slice = m(*slice);
            Subscript { value, slice }
        }
        Starred { value } => Starred { value: m(*value) },
        List { elts } => List {
            elts: map_vec(elts, m),
        },
        Tuple { elts } => Tuple {
            elts: map_vec(elts, m),
        },
        Slice { lower, upper, step } => {
            let lower = map_opt(lower, m);
            let upper = map_opt(upper, m);
            let step = map_opt(step, m);
            Slice { lower, upper, step }
        }
        Paren { value } => Paren { value: m(*value) },
        Arguments {
            posonlyargs,
            args,
            vararg,
            kwonlyargs,
            kw_defaults,
            kwarg,
            defaults,
        } => {
            let posonlyargs = map_vec(posonlyargs, m);
            let args = map_vec(args, m);
            let vararg = map_opt(vararg, m);
            let kwonlyargs = map_vec(kwonlyargs, m);
            let kw_defaults = kw_defaults.iter().map(|d| map_opt(d, m)).collect();
            let kwarg = map_opt(kwarg, m);
            let defaults = map_vec(defaults, m);
            Arguments {
                posonlyargs,
                args,
                vararg,
                kwonlyargs,
                kw_defaults,
                kwarg,
                defaults,
            }
        }
        Arg { name, annotation } => Arg {
            name: name.clone(),
            annotation: map_opt(annotation, m),
        },
        Keyword { arg, value } => Keyword {
            arg: arg.clone(),
            value: m(*value),
        },
        Comprehension {
            target,
            iter,
            ifs,
            is_async,
        } => {
            let target = m(*target);
            let iter = m(*iter);
            let ifs = map_vec(ifs, m);
            Comprehension {
                target,
                iter,
                ifs,
                is_async: *is_async,
            }
        }
        ExceptHandler { typ, name, body } => {
            let typ = map_opt(typ, m);
            let body = map_vec(body, m);
            ExceptHandler {
                typ,
                name: name.clone(),
                body,
            }
        }
        WithItem {
            context_expr,
            optional_vars,
        } => {
            let context_expr = m(*context_expr);
            let optional_vars = map_opt(optional_vars, m);
            WithItem {
                context_expr,
                optional_vars,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOperator;

    #[test]
    fn children_follow_field_order() {
        let payload = NodePayload::BinOp {
            left: NodeRef { index: 4 },
            op: BinOperator::Add,
            right: NodeRef { index: 2 },
        };
        assert_eq!(
            children(&payload),
            vec![NodeRef { index: 4 }, NodeRef { index: 2 }]
        );
    }

    #[test]
    fn dict_keys_precede_values() {
        let payload = NodePayload::Dict {
            keys: vec![Some(NodeRef { index: 1 }), None],
            values: vec![NodeRef { index: 2 }, NodeRef { index: 3 }],
        };
        assert_eq!(
            children(&payload),
            vec![
                NodeRef { index: 1 },
                NodeRef { index: 2 },
                NodeRef { index: 3 }
            ]
        );
    }

    #[test]
    fn remap_rewrites_every_slot() {
        let payload = NodePayload::Slice {
            lower: Some(NodeRef { index: 1 }),
            upper: None,
            step: Some(NodeRef { index: 3 }),
        };
        let remapped = remap_payload_with(&payload, |r| NodeRef {
            index: r.index + 10,
        });
        assert_eq!(
            remapped,
            NodePayload::Slice {
                lower: Some(NodeRef { index: 11 }),
                upper: None,
                step: Some(NodeRef { index: 13 }),
            }
        );
    }
}
