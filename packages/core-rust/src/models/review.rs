//! Review: one per (bootcamp, user), feeding the bootcamp's average rating.

use crate::schema::{CollectionSchema, FieldDef};

pub const COLLECTION: &str = "reviews";

pub const BOOTCAMP: &str = "bootcamp";
pub const USER: &str = "user";
pub const RATING: &str = "rating";

#[must_use]
pub fn schema() -> CollectionSchema {
    CollectionSchema::new(
        COLLECTION,
        vec![
            FieldDef::string("title")
                .required("Please add a title for the review.")
                .trim()
                .max_length(100),
            FieldDef::string("text").required("Please add some text."),
            FieldDef::number(RATING)
                .required("Please add a rating between 1 and 10.")
                .range(1.0, 10.0),
            FieldDef::date("createdAt").default_now(),
            FieldDef::reference(BOOTCAMP).required("Review must belong to a bootcamp"),
            FieldDef::reference(USER).required("Review must belong to a user"),
        ],
    )
    .unique_together(&[BOOTCAMP, USER])
}
