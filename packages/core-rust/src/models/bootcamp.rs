//! Bootcamp: the parent resource carrying the derived averages.

use crate::schema::{CollectionSchema, FieldDef};

pub const COLLECTION: &str = "bootcamps";

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const AVERAGE_RATING: &str = "averageRating";
pub const AVERAGE_COST: &str = "averageCost";

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

#[must_use]
pub fn schema() -> CollectionSchema {
    CollectionSchema::new(
        COLLECTION,
        vec![
            FieldDef::string(NAME)
                .required("Please add a name")
                .trim()
                .max_length(50)
                .unique(),
            FieldDef::string(DESCRIPTION)
                .required("Please add a description")
                .max_length(500),
            FieldDef::string("website"),
            FieldDef::string("phone").max_length(20),
            FieldDef::string("email"),
            FieldDef::string("address"),
            FieldDef::object("location"),
            FieldDef::string_array("careers")
                .required("Please add at least one career")
                .one_of(&CAREERS),
            FieldDef::number(AVERAGE_RATING).derived(),
            FieldDef::number(AVERAGE_COST).derived(),
            FieldDef::string("photo").default_value("no-photo.jpg".into()),
            FieldDef::boolean("housing").default_value(false.into()),
            FieldDef::boolean("jobAssistance").default_value(false.into()),
            FieldDef::boolean("jobGuarantee").default_value(false.into()),
            FieldDef::boolean("acceptGi").default_value(false.into()),
            FieldDef::date("createdAt").default_now(),
            FieldDef::reference("user").required("Bootcamp must belong to a user"),
        ],
    )
}
