#![forbid(unsafe_code)]

//! Assignability and inference over `Meta`.
//!
//! `compare(x, y)` asks whether a value of type `y` may be stored into a
//! target of type `x`; it is directional. `eval(x, y)` then pins down
//! whichever side is still untyped and fills in array lengths that were left
//! open, walking aggregate literals element by element.

use ascl_ast::{Meta, NominalKind, TypeKind};

use crate::error::SemanticError;

pub fn compare(x: &Meta, y: &Meta) -> Result<(), SemanticError> {
    if x.is_array() {
        return compare_array(x, 0, y);
    }
    if y.is_array() {
        return Err(mismatch(x, y));
    }
    compare_type(x, y)
}

fn mismatch(x: &Meta, y: &Meta) -> SemanticError {
    SemanticError::mismatched_type(x, y, y.span)
}

/// `x` without its array dimensions.
fn base_of(x: &Meta) -> Meta {
    let mut base = x.clone();
    base.dims.clear();
    base
}

fn compare_type(x: &Meta, y: &Meta) -> Result<(), SemanticError> {
    if x.untyped || y.untyped {
        let compatible = x.ty == y.ty
            || (x.ty.is_integer() && y.ty.is_integer())
            || (x.is_nullable() && y.is_nullable());
        return if compatible {
            Ok(())
        } else {
            Err(mismatch(x, y))
        };
    }

    match x.ty {
        TypeKind::Map => compare_map(x, y),
        TypeKind::Tuple => compare_tuple(x, y),
        TypeKind::Struct => compare_struct(x, y),
        TypeKind::Object => compare_object(x, y),
        ty if ty != y.ty => Err(SemanticError::mismatched_type(
            ty.name(),
            y.ty.name(),
            y.span,
        )),
        _ => Ok(()),
    }
}

fn compare_map(x: &Meta, y: &Meta) -> Result<(), SemanticError> {
    match y.ty {
        // Possibly-null reference.
        TypeKind::Object => Ok(()),
        TypeKind::Map => {
            for (xe, ye) in x.elems.iter().zip(&y.elems) {
                compare(xe, ye)?;
            }
            Ok(())
        }
        TypeKind::Tuple if !y.is_array() => {
            for pair in &y.elems {
                if !pair.is_tuple() {
                    return Err(mismatch(x, pair));
                }
                if pair.elems.len() != x.elems.len() {
                    return Err(SemanticError::mismatched_count(
                        "key-value",
                        x.elems.len(),
                        pair.elems.len(),
                        pair.span,
                    ));
                }
                for (xe, ye) in x.elems.iter().zip(&pair.elems) {
                    compare(xe, ye)?;
                }
            }
            Ok(())
        }
        _ => Err(mismatch(x, y)),
    }
}

fn compare_struct(x: &Meta, y: &Meta) -> Result<(), SemanticError> {
    if y.is_struct() {
        let same = match (&x.nominal, &y.nominal) {
            (Some(a), Some(b)) => a.name == b.name,
            _ => false,
        };
        return if same { Ok(()) } else { Err(mismatch(x, y)) };
    }
    if !y.is_tuple() {
        return Err(mismatch(x, y));
    }
    if x.elems.len() != y.elems.len() {
        return Err(SemanticError::mismatched_count(
            "field",
            x.elems.len(),
            y.elems.len(),
            y.span,
        ));
    }
    for (xe, ye) in x.elems.iter().zip(&y.elems) {
        compare(xe, ye)?;
    }
    Ok(())
}

/// Number of elements of `y` once nested tuples are spread one level.
fn flat_len(y: &Meta) -> usize {
    y.elems
        .iter()
        .map(|e| if e.is_tuple() { e.elems.len() } else { 1 })
        .sum()
}

fn compare_tuple(x: &Meta, y: &Meta) -> Result<(), SemanticError> {
    if !y.is_tuple() {
        return Err(mismatch(x, y));
    }

    if x.elems.len() == y.elems.len() {
        for (xe, ye) in x.elems.iter().zip(&y.elems) {
            compare(xe, ye)?;
        }
        return Ok(());
    }

    if x.elems.len() < y.elems.len() {
        return Err(SemanticError::mismatched_count(
            "element",
            x.elems.len(),
            y.elems.len(),
            y.span,
        ));
    }

    let flat = flat_len(y);
    if flat != x.elems.len() {
        return Err(SemanticError::mismatched_count(
            "element",
            x.elems.len(),
            flat,
            y.span,
        ));
    }

    let mut xs = x.elems.iter();
    for ye in &y.elems {
        let group: &[Meta] = if ye.is_tuple() {
            &ye.elems
        } else {
            std::slice::from_ref(ye)
        };
        for item in group {
            match xs.next() {
                Some(xe) => compare(xe, item)?,
                None => return Err(mismatch(x, y)),
            }
        }
    }
    Ok(())
}

fn compare_object(x: &Meta, y: &Meta) -> Result<(), SemanticError> {
    if !y.is_object() {
        return Err(mismatch(x, y));
    }
    let Some(target) = &x.nominal else {
        return Ok(());
    };
    match target.kind {
        NominalKind::Contract => match &y.nominal {
            Some(n) if n.kind == NominalKind::Contract && n.id == target.id => Ok(()),
            _ => Err(mismatch(x, y)),
        },
        // Any contract may be used through an interface.
        NominalKind::Interface | NominalKind::Struct => Ok(()),
    }
}

fn compare_array(x: &Meta, dim: usize, y: &Meta) -> Result<(), SemanticError> {
    if y.is_array() {
        compare_type(x, y)?;

        let rest = &x.dims[dim.min(x.dims.len())..];
        if rest.len() != y.dims.len() {
            return Err(mismatch(x, y));
        }
        for (xd, yd) in rest.iter().zip(&y.dims) {
            if let Some(expected) = xd {
                if *yd != Some(*expected) {
                    return Err(SemanticError::mismatched_count(
                        "element",
                        *expected as usize,
                        yd.unwrap_or(0) as usize,
                        y.span,
                    ));
                }
            }
        }
        return Ok(());
    }

    if y.is_tuple() {
        if let Some(Some(expected)) = x.dims.get(dim) {
            if *expected as usize != y.elems.len() {
                return Err(SemanticError::mismatched_count(
                    "element",
                    *expected as usize,
                    y.elems.len(),
                    y.span,
                ));
            }
        }

        let innermost = dim + 1 >= x.dims.len();
        let base = base_of(x);
        for ye in &y.elems {
            if !innermost {
                compare_array(x, dim + 1, ye)?;
            } else if ye.is_array() {
                return Err(mismatch(&base, ye));
            } else {
                compare_type(&base, ye)?;
            }
        }
        return Ok(());
    }

    // Only `null` stands in for an array.
    if y.untyped && y.is_object() {
        Ok(())
    } else {
        Err(mismatch(x, y))
    }
}

pub fn eval(x: &mut Meta, y: &mut Meta) {
    if x.is_array() {
        eval_array(x, 0, y);
    } else {
        eval_type(x, y);
    }
}

/// Copies the type of `src` onto `dst`, keeping `dst`'s dimensions and span.
fn adopt(dst: &mut Meta, src: &Meta) {
    dst.ty = src.ty;
    dst.untyped = src.untyped;
    dst.elems = src.elems.clone();
    dst.nominal = src.nominal.clone();
}

fn eval_type(x: &mut Meta, y: &mut Meta) {
    if x.untyped {
        adopt(x, y);
        return;
    }
    if y.untyped {
        adopt(y, x);
        return;
    }
    if !y.is_tuple() {
        return;
    }

    match x.ty {
        TypeKind::Map => {
            for pair in y.elems.iter_mut() {
                for (xe, ye) in x.elems.iter_mut().zip(pair.elems.iter_mut()) {
                    eval(xe, ye);
                }
            }
            let span = y.span;
            *y = base_of(x).with_span(span);
        }
        TypeKind::Struct => {
            for (xe, ye) in x.elems.iter_mut().zip(y.elems.iter_mut()) {
                eval(xe, ye);
            }
            y.ty = TypeKind::Struct;
            y.untyped = false;
            y.nominal = x.nominal.clone();
        }
        TypeKind::Tuple if x.elems.len() == y.elems.len() => {
            for (xe, ye) in x.elems.iter_mut().zip(y.elems.iter_mut()) {
                eval(xe, ye);
            }
        }
        TypeKind::Tuple => {
            let mut xs = x.elems.iter_mut();
            for ye in y.elems.iter_mut() {
                if ye.is_tuple() {
                    for item in ye.elems.iter_mut() {
                        if let Some(xe) = xs.next() {
                            eval(xe, item);
                        }
                    }
                } else if let Some(xe) = xs.next() {
                    eval(xe, ye);
                }
            }
        }
        _ => {}
    }
}

fn eval_array(x: &mut Meta, dim: usize, y: &mut Meta) {
    if !y.is_tuple() || dim >= x.dims.len() {
        eval_type(x, y);
        return;
    }

    for ye in y.elems.iter_mut() {
        eval_array(x, dim + 1, ye);
    }

    let len = y.elems.len() as u32;
    if let Some(d) = x.dims.get_mut(dim) {
        if d.is_none() {
            *d = Some(len);
        }
    }

    let mut dims = x.dims[dim..].to_vec();
    dims[0] = Some(len);

    adopt(y, x);
    y.dims = dims;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_literal_adopts_declared_width() {
        let mut x = Meta::new(TypeKind::Int16);
        let mut y = Meta::untyped(TypeKind::Int64);
        compare(&x, &y).expect("compatible");
        eval(&mut x, &mut y);
        assert_eq!(y.ty, TypeKind::Int16);
        assert!(!y.untyped);
    }

    #[test]
    fn unsized_dimension_is_taken_from_the_aggregate() {
        let mut x = Meta::new(TypeKind::Int32).with_dims(vec![None]);
        let mut y = Meta::tuple(vec![Meta::untyped(TypeKind::Int64); 3]);
        compare(&x, &y).expect("compatible");
        eval(&mut x, &mut y);

        assert_eq!(x.dims, vec![Some(3)]);
        assert_eq!(y.ty, TypeKind::Int32);
        assert_eq!(y.dims, vec![Some(3)]);
    }

    #[test]
    fn nested_aggregate_fills_every_dimension() {
        let row = Meta::tuple(vec![Meta::untyped(TypeKind::Int64); 2]);
        let mut x = Meta::new(TypeKind::Int8).with_dims(vec![None, None]);
        let mut y = Meta::tuple(vec![row.clone(), row.clone(), row]);
        eval(&mut x, &mut y);

        assert_eq!(x.dims, vec![Some(3), Some(2)]);
        assert_eq!(y.dims, vec![Some(3), Some(2)]);
        assert_eq!(y.elems.len(), 0);
    }
}
