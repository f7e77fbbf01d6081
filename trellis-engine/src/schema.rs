use crate::prelude::graph::*;
use indexmap::IndexMap;

/// The kind of a scalar field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarKind {
    Boolean,
    Float,
    Id,
    Int,
    String,
}

/// How many records a relation yields.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    One,
    Many,
}

/// How a relation is resolved against the store.
///
/// This is a closed set. Execution picks the store call with a single match on
/// the variant, so a new strategy means a new variant here and a new arm there.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// Follow an id held by the source record in the named field.
    ForeignKey { key: String },

    /// The target records hold the source record's id.
    ReverseForeignKey,

    /// The target records are linked to the source through a join table.
    Junction,

    /// Every record of the target type. Root fields only.
    Collection,

    /// One record of the target type, picked by the request's `id` argument.
    /// Root fields only.
    ByIdArgument,
}

impl Resolution {
    pub fn foreign_key(key: impl Into<String>) -> Self {
        Resolution::ForeignKey { key: key.into() }
    }
}

/// A traversable edge from one entity type to another.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Relation {
    pub target: String,
    pub cardinality: Cardinality,
    pub resolution: Resolution,
}

impl Relation {
    pub fn one(target: impl Into<String>, resolution: Resolution) -> Self {
        Relation {
            target: target.into(),
            cardinality: Cardinality::One,
            resolution,
        }
    }

    pub fn many(target: impl Into<String>, resolution: Resolution) -> Self {
        Relation {
            target: target.into(),
            cardinality: Cardinality::Many,
            resolution,
        }
    }
}

/// A field of an entity type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldType {
    Scalar(ScalarKind),
    Relation(Relation),
}

/// An entity type and its declared fields, in declaration order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityType {
    name: String,
    fields: IndexMap<String, FieldType>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        EntityType {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn scalar(mut self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.fields.insert(name.into(), FieldType::Scalar(kind));
        self
    }

    pub fn relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.fields.insert(name.into(), FieldType::Relation(relation));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.get(name)
    }
}

/// A validated registry of entity types and root fields.
///
/// A schema only exists in validated form: every relation target resolves,
/// every foreign key names an id field, and root and entity fields each use
/// the resolutions reserved for them. Execution relies on this and does not
/// re-check.
#[derive(Clone, Debug)]
pub struct Schema {
    root: IndexMap<String, Relation>,
    types: IndexMap<String, EntityType>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn root_field(&self, name: &str) -> Option<&Relation> {
        self.root.get(name)
    }

    pub fn entity(&self, name: &str) -> Option<&EntityType> {
        self.types.get(name)
    }
}

/// Collects entity types and root fields, then validates the whole registry
/// at once.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    root: IndexMap<String, Relation>,
    types: IndexMap<String, EntityType>,
    duplicates: Vec<String>,
}

impl SchemaBuilder {
    pub fn entity(mut self, entity: EntityType) -> Self {
        if self.types.contains_key(entity.name()) {
            self.duplicates.push(entity.name().to_string());
        } else {
            self.types.insert(entity.name().to_string(), entity);
        }
        self
    }

    pub fn root(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.root.insert(name.into(), relation);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let SchemaBuilder {
            root,
            types,
            duplicates,
        } = self;

        if let Some(name) = duplicates.into_iter().next() {
            return Err(SchemaError::DuplicateEntity(name));
        }

        for entity in types.values() {
            match entity.field("id") {
                Some(FieldType::Scalar(ScalarKind::Id)) => {}
                _ => return Err(SchemaError::MissingId(entity.name.clone())),
            }

            for (field, field_type) in &entity.fields {
                let relation = match field_type {
                    FieldType::Relation(relation) => relation,
                    FieldType::Scalar(_) => continue,
                };
                if !types.contains_key(&relation.target) {
                    return Err(SchemaError::UnknownRelationTarget {
                        type_name: entity.name.clone(),
                        field: field.clone(),
                        target: relation.target.clone(),
                    });
                }
                match &relation.resolution {
                    Resolution::ForeignKey { key } => {
                        if relation.cardinality == Cardinality::Many {
                            return Err(SchemaError::InvalidCardinality {
                                type_name: entity.name.clone(),
                                field: field.clone(),
                            });
                        }
                        match entity.field(key) {
                            Some(FieldType::Scalar(ScalarKind::Id)) => {}
                            _ => {
                                return Err(SchemaError::InvalidForeignKey {
                                    type_name: entity.name.clone(),
                                    field: field.clone(),
                                    key: key.clone(),
                                })
                            }
                        }
                    }
                    Resolution::ReverseForeignKey | Resolution::Junction => {}
                    Resolution::Collection | Resolution::ByIdArgument => {
                        return Err(SchemaError::InvalidFieldResolution {
                            type_name: entity.name.clone(),
                            field: field.clone(),
                        });
                    }
                }
            }
        }

        for (field, relation) in &root {
            if !types.contains_key(&relation.target) {
                return Err(SchemaError::UnknownRelationTarget {
                    type_name: "query".to_string(),
                    field: field.clone(),
                    target: relation.target.clone(),
                });
            }
            let well_formed = match &relation.resolution {
                Resolution::Collection => relation.cardinality == Cardinality::Many,
                Resolution::ByIdArgument => relation.cardinality == Cardinality::One,
                _ => false,
            };
            if !well_formed {
                return Err(SchemaError::InvalidRootResolution(field.clone()));
            }
        }

        Ok(Schema { root, types })
    }
}
