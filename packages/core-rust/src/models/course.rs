//! Course: belongs to a bootcamp and feeds its average cost.

use crate::schema::{CollectionSchema, FieldDef};

pub const COLLECTION: &str = "courses";

pub const BOOTCAMP: &str = "bootcamp";
pub const TUITION: &str = "tuition";

#[must_use]
pub fn schema() -> CollectionSchema {
    CollectionSchema::new(
        COLLECTION,
        vec![
            FieldDef::string("title")
                .required("Please add a course title")
                .trim(),
            FieldDef::string("description").required("Please add a description"),
            FieldDef::string("weeks").required("Please add number of weeks"),
            FieldDef::number(TUITION)
                .required("Please add a tuition cost")
                .min(0.0),
            FieldDef::string("minimumSkill")
                .required("Please add a minimum skill")
                .one_of(&["beginner", "intermediate", "advanced"]),
            FieldDef::boolean("scholarshipAvailable").default_value(false.into()),
            FieldDef::date("createdAt").default_now(),
            FieldDef::reference(BOOTCAMP).required("Course must belong to a bootcamp"),
            FieldDef::reference("user").required("Course must belong to a user"),
        ],
    )
}
