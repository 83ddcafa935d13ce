//! Type table: primitives, library types, instantiations and the types
//! declared by the analyzed tree.

use rustc_hash::FxHashMap;

use plume_ir::ast::{MemberKind, Modifiers, ParamModifier, TypeDeclKind, TypeExpr};
use plume_ir::{
    Component, Conversion, LocalFnId, MemberInfo, Name, SharedInterner, SymbolKind, SyntaxTree, TypeData,
    TypeExprId, TypeId, TypeShape,
};

use crate::library;

/// Generic type definition that can be instantiated with arguments.
#[derive(Clone, Debug)]
pub(crate) enum GenericDef {
    List,
    Enumerable,
    Func,
    Action,
    /// Generic type declared in the analyzed tree.
    Declared { def: TypeId, params: Vec<TypeId> },
}

pub(crate) struct TypeTable {
    pub(crate) interner: SharedInterner,
    types: Vec<TypeData>,
    by_name: FxHashMap<Name, TypeId>,
    generics: FxHashMap<Name, GenericDef>,
    instances: FxHashMap<(Name, Vec<TypeId>), TypeId>,
    arrays: FxHashMap<TypeId, TypeId>,
    nullables: FxHashMap<TypeId, TypeId>,
    tuples: FxHashMap<Vec<TypeId>, TypeId>,
    type_params: FxHashMap<Name, TypeId>,
    /// Primary-constructor parameters of declared types.
    primary_params: FxHashMap<TypeId, Vec<(Name, TypeId)>>,
    /// Bound type of every type expression in the tree.
    bound: Vec<TypeId>,
}

impl TypeTable {
    /// Table with primitives and library types.
    pub(crate) fn new(interner: SharedInterner) -> Self {
        let mut table = TypeTable {
            interner,
            types: Vec::new(),
            by_name: FxHashMap::default(),
            generics: FxHashMap::default(),
            instances: FxHashMap::default(),
            arrays: FxHashMap::default(),
            nullables: FxHashMap::default(),
            tuples: FxHashMap::default(),
            type_params: FxHashMap::default(),
            primary_params: FxHashMap::default(),
            bound: Vec::new(),
        };
        table.add_primitives();
        library::install(&mut table);
        table
    }

    pub(crate) fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub(crate) fn str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    fn add_primitives(&mut self) {
        let primitives: [(TypeId, &str, TypeShape, bool); 10] = [
            (TypeId::UNKNOWN, "dynamic", TypeShape::Unknown, false),
            (TypeId::OBJECT, "object", TypeShape::Class, false),
            (TypeId::BOOL, "bool", TypeShape::Primitive, true),
            (TypeId::INT, "int", TypeShape::Primitive, true),
            (TypeId::LONG, "long", TypeShape::Primitive, true),
            (TypeId::DOUBLE, "double", TypeShape::Primitive, true),
            (TypeId::CHAR, "char", TypeShape::Primitive, true),
            (TypeId::STRING, "string", TypeShape::Class, false),
            (TypeId::VOID, "void", TypeShape::Void, false),
            (TypeId::NULL, "null", TypeShape::Null, false),
        ];
        for (id, name, shape, is_value_type) in primitives {
            debug_assert_eq!(id.index(), self.types.len());
            let mut data = TypeData::unknown(self.name(name));
            data.shape = shape;
            data.is_value_type = is_value_type;
            if !matches!(shape, TypeShape::Unknown | TypeShape::Void | TypeShape::Null)
                && id != TypeId::OBJECT
            {
                data.base = Some(TypeId::OBJECT);
            }
            self.types.push(data);
            if !matches!(shape, TypeShape::Null) {
                self.by_name.insert(self.name(name), id);
            }
        }
        for (alias, id) in [
            ("Object", TypeId::OBJECT),
            ("Boolean", TypeId::BOOL),
            ("Int32", TypeId::INT),
            ("Int64", TypeId::LONG),
            ("Double", TypeId::DOUBLE),
            ("Char", TypeId::CHAR),
            ("String", TypeId::STRING),
        ] {
            self.by_name.insert(self.name(alias), id);
        }

        let object_members = vec![
            self.method("Equals", TypeId::BOOL, vec![TypeId::OBJECT], false),
            self.method("GetHashCode", TypeId::INT, vec![], false),
            self.method("ToString", TypeId::STRING, vec![], false),
            self.method("Equals", TypeId::BOOL, vec![TypeId::OBJECT, TypeId::OBJECT], true),
            self.method("ReferenceEquals", TypeId::BOOL, vec![TypeId::OBJECT, TypeId::OBJECT], true),
        ];
        self.types[TypeId::OBJECT.index()].members = object_members;

        let string_members = vec![
            self.property("Length", TypeId::INT),
            self.method("Substring", TypeId::STRING, vec![TypeId::INT, TypeId::INT], false),
            self.method("Contains", TypeId::BOOL, vec![TypeId::STRING], false),
            self.method("IndexOf", TypeId::INT, vec![TypeId::STRING], false),
            self.method("Format", TypeId::STRING, vec![TypeId::STRING], true),
            self.method("Concat", TypeId::STRING, vec![TypeId::OBJECT], true),
        ];
        let string = &mut self.types[TypeId::STRING.index()];
        string.members = string_members;
        string.element = Some(TypeId::CHAR);

        let compare = self.method("CompareTo", TypeId::INT, vec![TypeId::OBJECT], false);
        for id in [TypeId::INT, TypeId::LONG, TypeId::DOUBLE, TypeId::CHAR] {
            self.types[id.index()].members.push(compare.clone());
        }
    }

    // Member constructors

    pub(crate) fn method(
        &self,
        name: &str,
        ret: TypeId,
        params: Vec<TypeId>,
        is_static: bool,
    ) -> MemberInfo {
        MemberInfo {
            name: self.name(name),
            kind: SymbolKind::Method,
            ty: ret,
            params,
            is_static,
        }
    }

    pub(crate) fn property(&self, name: &str, ty: TypeId) -> MemberInfo {
        MemberInfo {
            name: self.name(name),
            kind: SymbolKind::Property,
            ty,
            params: Vec::new(),
            is_static: false,
        }
    }

    // Table access

    pub(crate) fn alloc(&mut self, data: TypeData) -> TypeId {
        let id = TypeId::new(u32::try_from(self.types.len()).unwrap_or(u32::MAX));
        self.types.push(data);
        id
    }

    pub(crate) fn register(&mut self, name: &str, data: TypeData) -> TypeId {
        let id = self.alloc(data);
        self.by_name.insert(self.name(name), id);
        id
    }

    pub(crate) fn register_generic(&mut self, name: &str, def: GenericDef) {
        self.generics.insert(self.name(name), def);
    }

    pub(crate) fn data(&self, id: TypeId) -> &TypeData {
        self.types
            .get(id.index())
            .unwrap_or(&self.types[TypeId::UNKNOWN.index()])
    }

    pub(crate) fn data_mut(&mut self, id: TypeId) -> &mut TypeData {
        &mut self.types[id.index()]
    }

    pub(crate) fn lookup(&self, name: Name) -> Option<TypeId> {
        if let Some(&id) = self.by_name.get(&name) {
            return Some(id);
        }
        let text = self.str(name);
        let last = text.rsplit('.').next().unwrap_or(text);
        if last.len() != text.len() {
            return self.by_name.get(&self.name(last)).copied();
        }
        None
    }

    /// Open definition of a generic type declared in the tree.
    pub(crate) fn generic_definition(&self, name: Name) -> Option<TypeId> {
        match self.generics.get(&name) {
            Some(GenericDef::Declared { def, .. }) => Some(*def),
            _ => None,
        }
    }

    pub(crate) fn type_param(&self, name: Name) -> Option<TypeId> {
        self.type_params.get(&name).copied()
    }

    pub(crate) fn primary_params(&self, ty: TypeId) -> &[(Name, TypeId)] {
        self.primary_params.get(&ty).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn bound(&self, id: TypeExprId) -> TypeId {
        self.bound
            .get(id.index())
            .copied()
            .unwrap_or(TypeId::UNKNOWN)
    }

    /// Members named `name` visible on `ty`, with the type declaring them.
    ///
    /// Searches the base chain and stops at the first type declaring the
    /// name, so overloads hidden by a derived type are not returned. Every
    /// type except `dynamic` falls back to `object`'s members.
    pub(crate) fn candidates(&self, ty: TypeId, name: Name) -> Vec<(TypeId, MemberInfo)> {
        let mut current = Some(ty);
        let mut depth = 0;
        while let Some(t) = current {
            let data = self.data(t);
            let found: Vec<(TypeId, MemberInfo)> = data
                .members
                .iter()
                .filter(|m| m.name == name)
                .map(|m| (t, m.clone()))
                .collect();
            if !found.is_empty() {
                return found;
            }
            if matches!(data.shape, TypeShape::Interface | TypeShape::TypeParam) {
                break;
            }
            current = data.base;
            depth += 1;
            if depth > 64 {
                break;
            }
        }
        if ty == TypeId::OBJECT || self.data(ty).shape == TypeShape::Unknown {
            return Vec::new();
        }
        self.data(TypeId::OBJECT)
            .members
            .iter()
            .filter(|m| m.name == name)
            .map(|m| (TypeId::OBJECT, m.clone()))
            .collect()
    }

    /// Member named `name` on `ty`, its bases, or `object`.
    pub(crate) fn find_member(&self, ty: TypeId, name: Name) -> Option<&MemberInfo> {
        let mut current = Some(ty);
        let mut depth = 0;
        while let Some(t) = current {
            let data = self.data(t);
            if let Some(member) = data.members.iter().find(|m| m.name == name) {
                return Some(member);
            }
            if matches!(data.shape, TypeShape::Interface | TypeShape::TypeParam) {
                break;
            }
            current = data.base;
            depth += 1;
            if depth > 64 {
                break;
            }
        }
        if ty == TypeId::OBJECT || self.data(ty).shape == TypeShape::Unknown {
            return None;
        }
        self.data(TypeId::OBJECT)
            .members
            .iter()
            .find(|m| m.name == name)
    }

    /// Element type produced by enumerating or indexing `ty`.
    pub(crate) fn element_of(&self, ty: TypeId) -> TypeId {
        let data = self.data(ty);
        match data.shape {
            TypeShape::Nullable => TypeId::UNKNOWN,
            _ => data.element.unwrap_or(TypeId::UNKNOWN),
        }
    }

    // Constructed types

    pub(crate) fn array_of(&mut self, element: TypeId) -> TypeId {
        if let Some(&id) = self.arrays.get(&element) {
            return id;
        }
        let enumerable = self.instantiate_name("IEnumerable", &[element]);
        let mut data = TypeData::unknown(self.name("Array"));
        data.shape = TypeShape::Array;
        data.element = Some(element);
        data.base = Some(TypeId::OBJECT);
        data.interfaces.push(enumerable);
        let id = self.alloc(data);
        let members = vec![
            self.property("Length", TypeId::INT),
            self.method("Slice", id, vec![TypeId::INT, TypeId::INT], false),
        ];
        self.data_mut(id).members = members;
        self.arrays.insert(element, id);
        id
    }

    pub(crate) fn nullable_of(&mut self, inner: TypeId) -> TypeId {
        if !self.data(inner).is_value_type || self.data(inner).shape == TypeShape::Nullable {
            return inner;
        }
        if let Some(&id) = self.nullables.get(&inner) {
            return id;
        }
        let mut data = TypeData::unknown(self.name("Nullable"));
        data.shape = TypeShape::Nullable;
        data.element = Some(inner);
        data.is_value_type = true;
        data.base = Some(TypeId::OBJECT);
        data.members = vec![
            self.property("HasValue", TypeId::BOOL),
            self.property("Value", inner),
        ];
        let id = self.alloc(data);
        self.nullables.insert(inner, id);
        id
    }

    pub(crate) fn tuple_of(&mut self, elements: &[TypeId]) -> TypeId {
        if let Some(&id) = self.tuples.get(elements) {
            return id;
        }
        let mut data = TypeData::unknown(self.name("ValueTuple"));
        data.shape = TypeShape::Tuple;
        data.args = elements.to_vec();
        data.is_value_type = true;
        data.base = Some(TypeId::OBJECT);
        for (i, &element) in elements.iter().enumerate() {
            let item = self.name(&format!("Item{}", i + 1));
            data.members.push(MemberInfo {
                name: item,
                kind: SymbolKind::Field,
                ty: element,
                params: Vec::new(),
                is_static: false,
            });
            data.components.push(Component {
                member: item,
                ty: element,
            });
        }
        let id = self.alloc(data);
        self.tuples.insert(elements.to_vec(), id);
        id
    }

    pub(crate) fn instantiate_name(&mut self, name: &str, args: &[TypeId]) -> TypeId {
        let name = self.name(name);
        self.instantiate(name, args)
    }

    /// Instantiate a generic definition, or `UNKNOWN` if `name` is not one.
    pub(crate) fn instantiate(&mut self, name: Name, args: &[TypeId]) -> TypeId {
        let key = (name, args.to_vec());
        if let Some(&id) = self.instances.get(&key) {
            return id;
        }
        let text = self.str(name);
        let last = self.name(text.rsplit('.').next().unwrap_or(text));
        let Some(def) = self.generics.get(&last).cloned() else {
            return TypeId::UNKNOWN;
        };
        let id = match def {
            GenericDef::List => library::instantiate_list(self, args),
            GenericDef::Enumerable => library::instantiate_enumerable(self, args),
            GenericDef::Func => library::instantiate_delegate(self, "Func", args.to_vec()),
            GenericDef::Action => {
                let mut sig = args.to_vec();
                sig.push(TypeId::VOID);
                library::instantiate_delegate(self, "Action", sig)
            }
            GenericDef::Declared { def, params } => self.instantiate_declared(def, &params, args),
        };
        self.instances.insert(key, id);
        id
    }

    fn instantiate_declared(&mut self, def: TypeId, params: &[TypeId], args: &[TypeId]) -> TypeId {
        let map: FxHashMap<TypeId, TypeId> = params
            .iter()
            .copied()
            .zip(args.iter().copied())
            .collect();
        let mut data = self.data(def).clone();
        data.args = args.to_vec();
        for member in &mut data.members {
            member.ty = self.substitute_with(member.ty, &map);
            let params: Vec<TypeId> = member.params.clone();
            member.params = params
                .into_iter()
                .map(|p| self.substitute_with(p, &map))
                .collect();
        }
        for component in &mut data.components {
            component.ty = self.substitute_with(component.ty, &map);
        }
        let id = self.alloc(data);
        if let Some(primary) = self.primary_params.get(&def).cloned() {
            let primary = primary
                .into_iter()
                .map(|(n, t)| (n, self.substitute_with(t, &map)))
                .collect();
            self.primary_params.insert(id, primary);
        }
        id
    }

    fn substitute_with(&mut self, ty: TypeId, map: &FxHashMap<TypeId, TypeId>) -> TypeId {
        if let Some(&arg) = map.get(&ty) {
            return arg;
        }
        let data = self.data(ty).clone();
        match data.shape {
            TypeShape::Array => {
                let element = data.element.unwrap_or(TypeId::UNKNOWN);
                let element = self.substitute_with(element, map);
                self.array_of(element)
            }
            TypeShape::Nullable => {
                let element = data.element.unwrap_or(TypeId::UNKNOWN);
                let element = self.substitute_with(element, map);
                self.nullable_of(element)
            }
            TypeShape::Tuple => {
                let elements: Vec<TypeId> = data
                    .args
                    .iter()
                    .map(|&a| self.substitute_with(a, map))
                    .collect();
                self.tuple_of(&elements)
            }
            _ if !data.args.is_empty() => {
                let args: Vec<TypeId> = data
                    .args
                    .iter()
                    .map(|&a| self.substitute_with(a, map))
                    .collect();
                if args == data.args {
                    ty
                } else {
                    self.instantiate(data.name, &args)
                }
            }
            _ => ty,
        }
    }

    // Declared types

    /// Register every type declared in `tree` and bind all type syntax.
    pub(crate) fn declare_tree(&mut self, tree: &SyntaxTree) {
        let mut ids = Vec::with_capacity(tree.unit.types.len());
        for decl in &tree.unit.types {
            let mut data = TypeData::unknown(decl.name);
            data.shape = match decl.kind {
                TypeDeclKind::Class | TypeDeclKind::Record => TypeShape::Class,
                TypeDeclKind::Struct | TypeDeclKind::RecordStruct => TypeShape::Struct,
                TypeDeclKind::Interface => TypeShape::Interface,
            };
            data.is_value_type = decl.kind.is_value_type();
            data.base = Some(TypeId::OBJECT);
            let id = self.alloc(data);
            ids.push(id);
            let mut params = Vec::new();
            for &param in &decl.type_params {
                params.push(self.declare_type_param(param));
            }
            if params.is_empty() {
                self.by_name.insert(decl.name, id);
            } else {
                self.data_mut(id).args.clone_from(&params);
                self.generics
                    .insert(decl.name, GenericDef::Declared { def: id, params });
            }
            for member in &decl.members {
                if let MemberKind::Method { type_params, .. } = &member.kind {
                    for &param in type_params {
                        self.declare_type_param(param);
                    }
                }
            }
        }
        for stmt_fn in tree_local_fn_type_params(tree) {
            self.declare_type_param(stmt_fn);
        }

        self.bound = vec![TypeId::UNKNOWN; tree.type_count()];
        for index in 0..self.bound.len() {
            let id = TypeExprId::new(u32::try_from(index).unwrap_or(u32::MAX));
            let ty = self.bind(tree, id);
            self.bound[index] = ty;
        }

        for (decl, &id) in tree.unit.types.iter().zip(&ids) {
            self.fill_declared(tree, decl, id);
        }
        // Instances created while binding copied the definition before its
        // members were known.
        self.refresh_declared_instances();
    }

    fn declare_type_param(&mut self, name: Name) -> TypeId {
        if let Some(&id) = self.type_params.get(&name) {
            return id;
        }
        let mut data = TypeData::unknown(name);
        data.shape = TypeShape::TypeParam;
        let id = self.alloc(data);
        self.type_params.insert(name, id);
        id
    }

    fn fill_declared(&mut self, tree: &SyntaxTree, decl: &plume_ir::ast::TypeDecl, id: TypeId) {
        let mut members = Vec::new();
        let mut components = Vec::new();
        let mut base = Some(TypeId::OBJECT);
        let mut interfaces = Vec::new();
        for (i, &b) in decl.bases.iter().enumerate() {
            let bt = self.bound(b);
            let shape = self.data(bt).shape;
            if i == 0 && shape == TypeShape::Class && decl.kind != TypeDeclKind::Interface {
                base = Some(bt);
            } else {
                interfaces.push(bt);
            }
        }

        if let Some(params) = decl.primary_params {
            let params: Vec<(Name, TypeId)> = tree
                .params(params)
                .iter()
                .map(|p| (p.name, self.bound(p.ty)))
                .collect();
            if decl.kind.is_record() {
                for &(name, ty) in &params {
                    members.push(MemberInfo {
                        name,
                        kind: SymbolKind::Property,
                        ty,
                        params: Vec::new(),
                        is_static: false,
                    });
                    components.push(Component { member: name, ty });
                }
            }
            self.primary_params.insert(id, params);
        }

        for member in &decl.members {
            let is_static = member.modifiers.intersects(Modifiers::STATIC | Modifiers::CONST);
            match &member.kind {
                MemberKind::Field { ty, name, .. } => members.push(MemberInfo {
                    name: *name,
                    kind: SymbolKind::Field,
                    ty: self.bound(*ty),
                    params: Vec::new(),
                    is_static,
                }),
                MemberKind::Property { ty, name, .. } => members.push(MemberInfo {
                    name: *name,
                    kind: SymbolKind::Property,
                    ty: self.bound(*ty),
                    params: Vec::new(),
                    is_static,
                }),
                MemberKind::Method {
                    name, params, ret, ..
                } => {
                    let param_list = tree.params(*params);
                    let is_deconstruct = self.str(*name) == "Deconstruct"
                        && !param_list.is_empty()
                        && param_list.iter().all(|p| p.modifier == ParamModifier::Out);
                    if is_deconstruct && components.is_empty() {
                        for p in param_list {
                            let member = find_component_member(self, &members, decl, p.name);
                            components.push(Component {
                                member,
                                ty: self.bound(p.ty),
                            });
                        }
                    }
                    members.push(MemberInfo {
                        name: *name,
                        kind: SymbolKind::Method,
                        ty: self.bound(*ret),
                        params: param_list.iter().map(|p| self.bound(p.ty)).collect(),
                        is_static,
                    });
                }
                MemberKind::Constructor { .. } | MemberKind::Operator { .. } => {}
            }
        }

        let data = self.data_mut(id);
        data.members = members;
        data.components = components;
        data.base = base;
        data.interfaces = interfaces;
    }

    fn refresh_declared_instances(&mut self) {
        let declared: Vec<((Name, Vec<TypeId>), TypeId)> = self
            .instances
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        for ((name, args), id) in declared {
            let Some(GenericDef::Declared { def, params }) = self.generics.get(&name).cloned()
            else {
                continue;
            };
            let fresh = self.instantiate_declared(def, &params, &args);
            let data = self.data(fresh).clone();
            *self.data_mut(id) = data;
        }
    }

    /// Bind one type expression, memoized in `bound`.
    fn bind(&mut self, tree: &SyntaxTree, id: TypeExprId) -> TypeId {
        if let Some(&ty) = self.bound.get(id.index()) {
            if ty != TypeId::UNKNOWN {
                return ty;
            }
        }
        let ty = match tree.type_expr(id) {
            TypeExpr::Named { name, args } => {
                let args: Vec<TypeId> = tree
                    .types(args)
                    .iter()
                    .map(|&a| self.bind(tree, a))
                    .collect();
                if args.is_empty() {
                    match self.lookup(name).or_else(|| self.type_param(name)) {
                        Some(ty) => ty,
                        // Plain `Action` is the parameterless delegate.
                        None if matches!(self.generics.get(&name), Some(GenericDef::Action)) => {
                            self.instantiate(name, &[])
                        }
                        None => TypeId::UNKNOWN,
                    }
                } else {
                    self.instantiate(name, &args)
                }
            }
            TypeExpr::Array(element) => {
                let element = self.bind(tree, element);
                self.array_of(element)
            }
            TypeExpr::Nullable(inner) => {
                let inner = self.bind(tree, inner);
                self.nullable_of(inner)
            }
            TypeExpr::Tuple(elements) => {
                let elements: Vec<TypeId> = tree
                    .types(elements)
                    .iter()
                    .map(|&a| self.bind(tree, a))
                    .collect();
                self.tuple_of(&elements)
            }
            TypeExpr::Void => TypeId::VOID,
            TypeExpr::Var | TypeExpr::Dynamic => TypeId::UNKNOWN,
        };
        if let Some(slot) = self.bound.get_mut(id.index()) {
            *slot = ty;
        }
        ty
    }

    // Relations

    /// `from` is `to`, derives from it, or implements it.
    pub(crate) fn is_subtype(&self, from: TypeId, to: TypeId) -> bool {
        let mut work = vec![from];
        let mut seen = 0;
        while let Some(t) = work.pop() {
            if t == to {
                return true;
            }
            seen += 1;
            if seen > 256 {
                break;
            }
            let data = self.data(t);
            if let Some(base) = data.base {
                work.push(base);
            }
            work.extend(data.interfaces.iter().copied());
        }
        false
    }

    pub(crate) fn classify(&self, from: TypeId, to: TypeId) -> Conversion {
        if from == to {
            return Conversion::Identity;
        }
        if from.is_unknown() || to.is_unknown() {
            return Conversion::Explicit;
        }
        let from_data = self.data(from);
        let to_data = self.data(to);
        if from == TypeId::NULL {
            return if to_data.shape == TypeShape::Nullable {
                Conversion::ImplicitNullable
            } else if to_data.is_value_type {
                Conversion::None
            } else {
                Conversion::ImplicitReference
            };
        }
        if to_data.shape == TypeShape::Nullable && to_data.element == Some(from) {
            return Conversion::ImplicitNullable;
        }
        if is_numeric_widening(from, to) {
            return Conversion::ImplicitNumeric;
        }
        if self.is_subtype(from, to) {
            return if from_data.is_value_type {
                Conversion::Boxing
            } else {
                Conversion::ImplicitReference
            };
        }
        let numeric = |t: TypeId| {
            matches!(
                t,
                TypeId::INT | TypeId::LONG | TypeId::DOUBLE | TypeId::CHAR
            )
        };
        if numeric(from) && numeric(to) {
            return Conversion::Explicit;
        }
        if self.is_subtype(to, from)
            || to_data.shape == TypeShape::Interface
            || from_data.shape == TypeShape::Interface
            || to_data.shape == TypeShape::TypeParam
            || from_data.shape == TypeShape::TypeParam
        {
            return Conversion::Explicit;
        }
        Conversion::None
    }
}

fn is_numeric_widening(from: TypeId, to: TypeId) -> bool {
    matches!(
        (from, to),
        (TypeId::INT, TypeId::LONG | TypeId::DOUBLE)
            | (TypeId::LONG, TypeId::DOUBLE)
            | (TypeId::CHAR, TypeId::INT | TypeId::LONG | TypeId::DOUBLE)
    )
}

/// Property or field a deconstruction parameter reads: the member whose
/// name matches the parameter ignoring case.
fn find_component_member(
    table: &TypeTable,
    members: &[MemberInfo],
    decl: &plume_ir::ast::TypeDecl,
    param: Name,
) -> Name {
    let wanted = table.str(param).to_lowercase();
    members
        .iter()
        .map(|m| m.name)
        .chain(decl.members.iter().filter_map(|m| match &m.kind {
            MemberKind::Field { name, .. } | MemberKind::Property { name, .. } => Some(*name),
            _ => None,
        }))
        .find(|&name| table.str(name).to_lowercase() == wanted)
        .unwrap_or(param)
}

fn tree_local_fn_type_params(tree: &SyntaxTree) -> Vec<Name> {
    (0..tree.local_fn_count())
        .flat_map(|i| {
            let id = LocalFnId::new(u32::try_from(i).unwrap_or(u32::MAX));
            tree.local_fn(id).type_params.clone()
        })
        .collect()
}
