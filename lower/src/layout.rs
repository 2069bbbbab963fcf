// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Fixed-width layout of arbitrary types as vectors of primitive slots.
//!
//! A custom type is laid out as a union: one discriminant slot followed by the
//! slots of every constructor's fields, for all constructors in declaration
//! order. Only the fields of the constructor named by the discriminant are
//! meaningful; the others hold well-typed placeholders. Arrays of custom
//! types become one array per slot.

use horn::syntax::{Binder, Constructor, CustomType, Expr, Type, VarKind};
use num_bigint::BigInt;
use std::sync::Arc;

use crate::{conf::DiscriminantStrategy, error::TranslationError};

/// Computes layouts under one discriminant strategy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeLayouter {
    /// Encoding of discriminants
    pub strategy: DiscriminantStrategy,
}

impl TypeLayouter {
    #[allow(missing_docs)]
    pub fn new(strategy: DiscriminantStrategy) -> Self {
        TypeLayouter { strategy }
    }

    /// The primitive signature of a type: integers, booleans and arrays of
    /// them, never a custom type.
    pub fn unfold(&self, ty: &Type) -> Vec<Type> {
        match ty {
            Type::Int | Type::Bool => vec![ty.clone()],
            Type::Array(element) => self.unfold(element).into_iter().map(Type::array).collect(),
            Type::Custom(custom) => {
                let mut slots = vec![self.discriminant_type(custom)];
                for ctor in &custom.constructors {
                    for param in &ctor.params {
                        slots.extend(self.unfold(param));
                    }
                }
                slots
            }
        }
    }

    /// The number of primitive slots of a type.
    pub fn width(&self, ty: &Type) -> usize {
        match ty {
            Type::Int | Type::Bool => 1,
            Type::Array(element) => self.width(element),
            Type::Custom(custom) => {
                1 + custom
                    .constructors
                    .iter()
                    .map(|c| self.constructor_width(c))
                    .sum::<usize>()
            }
        }
    }

    /// The number of slots taken by a constructor's fields.
    pub fn constructor_width(&self, ctor: &Constructor) -> usize {
        ctor.params.iter().map(|p| self.width(p)).sum()
    }

    /// Whether discriminants of this type are booleans.
    pub fn has_boolean_discriminant(&self, custom: &CustomType) -> bool {
        self.strategy == DiscriminantStrategy::Boolean && custom.constructors.len() == 2
    }

    /// The type of the first slot of a custom type.
    pub fn discriminant_type(&self, custom: &CustomType) -> Type {
        if self.has_boolean_discriminant(custom) {
            Type::Bool
        } else {
            Type::Int
        }
    }

    /// The discriminant recording the constructor at `index`.
    pub fn discriminant(&self, custom: &CustomType, index: usize) -> Expr {
        if self.has_boolean_discriminant(custom) {
            Expr::Bool(index == 1)
        } else {
            Expr::Int(BigInt::from(index))
        }
    }

    /// The slot index where the fields of the constructor at `index` start.
    pub fn field_offset(&self, custom: &CustomType, index: usize) -> usize {
        1 + custom.constructors[..index]
            .iter()
            .map(|c| self.constructor_width(c))
            .sum::<usize>()
    }

    /// The default value of a primitive slot type.
    pub fn default_value(&self, slot: &Type) -> Expr {
        match slot {
            Type::Int => Expr::int(0),
            Type::Bool => Expr::false_(),
            Type::Array(element) => Expr::array_init(self.default_value(element)),
            Type::Custom(custom) => panic!("{} is not a primitive slot type", custom.name),
        }
    }

    /// A well-typed vector of default values with the layout of `ty`.
    pub fn placeholder(&self, ty: &Type) -> Vec<Expr> {
        self.unfold(ty)
            .iter()
            .map(|slot| self.default_value(slot))
            .collect()
    }

    fn constructor_index(
        &self,
        custom: &Arc<CustomType>,
        ctor: &Constructor,
    ) -> Result<usize, TranslationError> {
        custom
            .constructor_index(ctor)
            .ok_or_else(|| TranslationError::UnknownConstructor {
                ty: Type::Custom(custom.clone()),
                constructor: ctor.name.clone(),
            })
    }

    /// Lay out a constructor application whose fields are already laid out.
    pub fn layout_construct(
        &self,
        custom: &Arc<CustomType>,
        ctor: &Constructor,
        fields: Vec<Vec<Expr>>,
    ) -> Result<Vec<Expr>, TranslationError> {
        let index = self.constructor_index(custom, ctor)?;
        let mut slots = self.placeholder(&Type::Custom(custom.clone()));
        slots[0] = self.discriminant(custom, index);
        let offset = self.field_offset(custom, index);
        let fields: Vec<Expr> = fields.into_iter().flatten().collect();
        assert_eq!(
            fields.len(),
            self.constructor_width(ctor),
            "fields of {} have the wrong width",
            ctor.name
        );
        slots.splice(offset..offset + fields.len(), fields);
        Ok(slots)
    }

    /// Slice a laid-out value into the laid-out fields of one constructor.
    pub fn flattened_fields(
        &self,
        custom: &Arc<CustomType>,
        ctor: &Constructor,
        value: &[Expr],
    ) -> Result<Vec<Vec<Expr>>, TranslationError> {
        let index = self.constructor_index(custom, ctor)?;
        let mut offset = self.field_offset(custom, index);
        Ok(ctor
            .params
            .iter()
            .map(|param| {
                let width = self.width(param);
                let field = value[offset..offset + width].to_vec();
                offset += width;
                field
            })
            .collect())
    }

    /// A boolean expression that holds iff the laid-out value was built with
    /// the given constructor. Integers and booleans have one constructor per
    /// literal, named by the literal.
    pub fn select_expr(
        &self,
        ty: &Type,
        ctor: &Constructor,
        value: &[Expr],
    ) -> Result<Expr, TranslationError> {
        let unknown = || TranslationError::UnknownConstructor {
            ty: ty.clone(),
            constructor: ctor.name.clone(),
        };
        match ty {
            Type::Bool => match ctor.name.as_str() {
                "true" => Ok(value[0].clone()),
                "false" => Ok(Expr::not(value[0].clone())),
                _ => Err(unknown()),
            },
            Type::Int => {
                let n: BigInt = ctor.name.parse().map_err(|_| unknown())?;
                Ok(Expr::eq(value[0].clone(), Expr::Int(n)))
            }
            Type::Custom(custom) => {
                let index = self.constructor_index(custom, ctor)?;
                if self.has_boolean_discriminant(custom) {
                    Ok(if index == 1 {
                        value[0].clone()
                    } else {
                        Expr::not(value[0].clone())
                    })
                } else {
                    Ok(Expr::eq(value[0].clone(), self.discriminant(custom, index)))
                }
            }
            Type::Array(_) => Err(TranslationError::SelectOnArray(ty.clone())),
        }
    }

    /// The binders a binder is split into. A binder whose type is its own
    /// layout is kept; otherwise slot `i` of `x` is named `x?i`.
    pub fn translate_binder(&self, binder: &Binder) -> Vec<Binder> {
        let slots = self.unfold(&binder.ty);
        if slots.len() == 1 && slots[0] == binder.ty {
            return vec![binder.clone()];
        }
        slots
            .iter()
            .enumerate()
            .map(|(i, slot)| Binder::new(&format!("{}?{i}", binder.name), slot))
            .collect()
    }

    /// The laid-out form of a variable reference.
    pub fn translate_var(&self, kind: VarKind, binder: &Binder) -> Vec<Expr> {
        self.translate_binder(binder)
            .into_iter()
            .map(|b| Expr::Var(kind, b))
            .collect()
    }
}
