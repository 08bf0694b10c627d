use serde::Deserialize;
use serde::Serialize;

/// Body of the root listing endpoint. Only the total is read.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleListing {
    pub count: i64,
}

/// A character as returned by `GET <base>/{id}`.
///
/// `id` never comes from the body: the fetcher sets it to the requested ID.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub birth_year: String,
    pub eye_color: String,
    pub gender: String,
    pub hair_color: String,
    pub height: String,
    pub homeworld: String,
    pub mass: String,
    pub skin_color: String,
    #[serde(default)]
    pub films: Vec<String>,
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub starships: Vec<String>,
    #[serde(default)]
    pub vehicles: Vec<String>,
}

/// One row of the `swapi_people` table.
#[derive(Default, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PersonRow {
    pub id: i64,
    pub name: String,
    pub birth_year: String,
    pub eye_color: String,
    pub gender: String,
    pub hair_color: String,
    pub height: String,
    pub homeworld: String,
    pub mass: String,
    pub skin_color: String,
    pub films: String,
    pub species: String,
    pub starships: String,
    pub vehicles: String,
}

pub fn join_refs(refs: &[String]) -> String {
    refs.join(", ")
}

impl From<&Person> for PersonRow {
    fn from(person: &Person) -> Self {
        PersonRow {
            id: person.id,
            name: person.name.to_string(),
            birth_year: person.birth_year.to_string(),
            eye_color: person.eye_color.to_string(),
            gender: person.gender.to_string(),
            hair_color: person.hair_color.to_string(),
            height: person.height.to_string(),
            homeworld: person.homeworld.to_string(),
            mass: person.mass.to_string(),
            skin_color: person.skin_color.to_string(),
            films: join_refs(&person.films),
            species: join_refs(&person.species),
            starships: join_refs(&person.starships),
            vehicles: join_refs(&person.vehicles),
        }
    }
}
