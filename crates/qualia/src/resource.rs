// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

/// Which operation a catalogued procedure name stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    ListKeys,
    Get,
    Put,
    Delete,
    RelationQueryAll,
    RelationQuerySubject,
    RelationQueryMood,
    RelationQueryBoth,
    RelationCreate,
    RelationDelete,
}

/// The canonical CRUD procedure names for one resource, derived once
/// from its naming alias instead of being formatted ad hoc at call
/// sites. The registry validates the assembled catalogue at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureFamily {
    list: String,
    get: String,
    put: String,
    delete: String,
}

impl ProcedureFamily {
    fn derive(alias: &str) -> Self {
        Self {
            list: format!("get_{alias}s"),
            get: format!("get_{alias}"),
            put: format!("put_{alias}"),
            delete: format!("delete_{alias}"),
        }
    }

    pub fn list(&self) -> &str {
        &self.list
    }

    pub fn get(&self) -> &str {
        &self.get
    }

    pub fn put(&self) -> &str {
        &self.put
    }

    pub fn delete(&self) -> &str {
        &self.delete
    }
}

/// Procedure names for the many-to-many "affects" family linking a
/// quale to moods. The four query variants differ only in which
/// filters they accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationFamily {
    query_all: String,
    query_subject: String,
    query_mood: String,
    query_both: String,
    create: String,
    delete: String,
}

impl RelationFamily {
    fn derive(alias: &str) -> Self {
        Self {
            query_all: format!("get_{alias}affects"),
            query_subject: format!("get_{alias}affects_{alias}"),
            query_mood: format!("get_{alias}affects_mood"),
            query_both: format!("get_{alias}affects_{alias}_mood"),
            create: format!("put_{alias}affects"),
            delete: format!("delete_{alias}affects"),
        }
    }

    pub fn query_all(&self) -> &str {
        &self.query_all
    }

    pub fn query_subject(&self) -> &str {
        &self.query_subject
    }

    pub fn query_mood(&self) -> &str {
        &self.query_mood
    }

    pub fn query_both(&self) -> &str {
        &self.query_both
    }

    pub fn create(&self) -> &str {
        &self.create
    }

    pub fn delete(&self) -> &str {
        &self.delete
    }
}

/// Declarative description of one resource: its name, its ordered
/// attributes (first attribute is the key) and the derived procedure
/// names. Everything the route layer and the executors need comes from
/// here rather than per-resource code.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    name: &'static str,
    attrs: &'static [&'static str],
    alias: Option<&'static str>,
    routed: bool,
    gated: bool,
    family: ProcedureFamily,
    relation: Option<RelationFamily>,
}

impl ResourceDescriptor {
    pub fn new(name: &'static str, attrs: &'static [&'static str]) -> Self {
        Self {
            name,
            attrs,
            alias: None,
            routed: true,
            gated: true,
            family: ProcedureFamily::derive(name),
            relation: None,
        }
    }

    /// Overrides the naming alias used to derive procedure names, for
    /// resources whose REST name contains characters the database
    /// naming convention avoids.
    pub fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self.family = ProcedureFamily::derive(alias);
        if self.relation.is_some() {
            self.relation = Some(RelationFamily::derive(alias));
        }
        self
    }

    /// Marks the resource as participating in the mood relation.
    pub fn related(mut self) -> Self {
        self.relation = Some(RelationFamily::derive(self.naming()));
        self
    }

    /// Keeps the resource out of the REST surface. Internal resources
    /// are still catalogued so their procedures resolve.
    pub fn internal(mut self) -> Self {
        self.routed = false;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn naming(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }

    pub fn attrs(&self) -> &'static [&'static str] {
        self.attrs
    }

    /// The key attribute, always the first declared one.
    pub fn key(&self) -> &'static str {
        self.attrs[0]
    }

    /// The non-key attributes, in declaration order.
    pub fn others(&self) -> &'static [&'static str] {
        &self.attrs[1..]
    }

    pub fn routed(&self) -> bool {
        self.routed
    }

    pub fn gated(&self) -> bool {
        self.gated
    }

    pub fn family(&self) -> &ProcedureFamily {
        &self.family
    }

    pub fn relation(&self) -> Option<&RelationFamily> {
        self.relation.as_ref()
    }

    /// Every procedure name this resource contributes to the catalogue.
    pub fn procedures(&self) -> Vec<(String, ProcedureKind)> {
        let mut names = vec![
            (self.family.list().to_string(), ProcedureKind::ListKeys),
            (self.family.get().to_string(), ProcedureKind::Get),
            (self.family.put().to_string(), ProcedureKind::Put),
            (self.family.delete().to_string(), ProcedureKind::Delete),
        ];
        if let Some(relation) = &self.relation {
            names.extend([
                (
                    relation.query_all().to_string(),
                    ProcedureKind::RelationQueryAll,
                ),
                (
                    relation.query_subject().to_string(),
                    ProcedureKind::RelationQuerySubject,
                ),
                (
                    relation.query_mood().to_string(),
                    ProcedureKind::RelationQueryMood,
                ),
                (
                    relation.query_both().to_string(),
                    ProcedureKind::RelationQueryBoth,
                ),
                (relation.create().to_string(), ProcedureKind::RelationCreate),
                (relation.delete().to_string(), ProcedureKind::RelationDelete),
            ]);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_follow_convention() {
        let mood = ResourceDescriptor::new("mood", &["name"]);
        assert_eq!(mood.family().list(), "get_moods");
        assert_eq!(mood.family().get(), "get_mood");
        assert_eq!(mood.family().put(), "put_mood");
        assert_eq!(mood.family().delete(), "delete_mood");
    }

    #[test]
    fn alias_redrives_both_families() {
        let music = ResourceDescriptor::new("music_genre", &["name"])
            .alias("musicgenre")
            .related();
        assert_eq!(music.name(), "music_genre");
        assert_eq!(music.family().get(), "get_musicgenre");
        let relation = music.relation().expect("related");
        assert_eq!(relation.query_all(), "get_musicgenreaffects");
        assert_eq!(relation.query_subject(), "get_musicgenreaffects_musicgenre");
        assert_eq!(relation.query_mood(), "get_musicgenreaffects_mood");
        assert_eq!(
            relation.query_both(),
            "get_musicgenreaffects_musicgenre_mood"
        );
        assert_eq!(relation.create(), "put_musicgenreaffects");
        assert_eq!(relation.delete(), "delete_musicgenreaffects");
    }

    #[test]
    fn alias_applies_when_set_after_related() {
        let media = ResourceDescriptor::new("media_genre", &["name"])
            .related()
            .alias("mediagenre");
        assert_eq!(media.family().put(), "put_mediagenre");
        let relation = media.relation().expect("related");
        assert_eq!(relation.create(), "put_mediagenreaffects");
    }

    #[test]
    fn key_and_others_split_attrs() {
        let color = ResourceDescriptor::new("color", &["name", "hue", "saturation", "brightness"]);
        assert_eq!(color.key(), "name");
        assert_eq!(color.others(), &["hue", "saturation", "brightness"]);
    }

    #[test]
    fn procedures_cover_relation_family() {
        let plain = ResourceDescriptor::new("mood", &["name"]);
        assert_eq!(plain.procedures().len(), 4);
        let related = ResourceDescriptor::new("taste", &["type"]).related();
        assert_eq!(related.procedures().len(), 10);
    }
}
