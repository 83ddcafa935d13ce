//! Library types every analyzed tree can reference.

use plume_ir::{TypeData, TypeId, TypeShape};

use crate::table::{GenericDef, TypeTable};

pub(crate) fn install(table: &mut TypeTable) {
    table.register_generic("List", GenericDef::List);
    table.register_generic("IEnumerable", GenericDef::Enumerable);
    table.register_generic("Func", GenericDef::Func);
    table.register_generic("Action", GenericDef::Action);

    let chars = table.instantiate_name("IEnumerable", &[TypeId::CHAR]);
    table.data_mut(TypeId::STRING).interfaces.push(chars);

    let data = value_type(table, "Index");
    let index = table.register("Index", data);
    let members = vec![
        table.property("Value", TypeId::INT),
        table.property("IsFromEnd", TypeId::BOOL),
        table.method("GetOffset", TypeId::INT, vec![TypeId::INT], false),
    ];
    table.data_mut(index).members = members;

    let data = value_type(table, "Range");
    let range = table.register("Range", data);
    let members = vec![table.property("Start", index), table.property("End", index)];
    table.data_mut(range).members = members;

    let data = class(table, "Exception", TypeId::OBJECT);
    let exception = table.register("Exception", data);
    let members = vec![table.property("Message", TypeId::STRING)];
    table.data_mut(exception).members = members;
    let data = class(table, "InvalidOperationException", exception);
    let invalid = table.register("InvalidOperationException", data);
    let data = class(table, "SwitchExpressionException", invalid);
    table.register("SwitchExpressionException", data);
    let data = class(table, "ArgumentNullException", exception);
    table.register("ArgumentNullException", data);

    let data = class(table, "Console", TypeId::OBJECT);
    let console = table.register("Console", data);
    let members = vec![
        table.method("WriteLine", TypeId::VOID, vec![TypeId::OBJECT], true),
        table.method("Write", TypeId::VOID, vec![TypeId::OBJECT], true),
    ];
    table.data_mut(console).members = members;

    let data = class(table, "Math", TypeId::OBJECT);
    let math = table.register("Math", data);
    let members = vec![
        table.method("Max", TypeId::INT, vec![TypeId::INT, TypeId::INT], true),
        table.method("Min", TypeId::INT, vec![TypeId::INT, TypeId::INT], true),
        table.method("Abs", TypeId::INT, vec![TypeId::INT], true),
    ];
    table.data_mut(math).members = members;
}

fn value_type(table: &TypeTable, name: &str) -> TypeData {
    let mut data = TypeData::unknown(table.name(name));
    data.shape = TypeShape::Struct;
    data.is_value_type = true;
    data.base = Some(TypeId::OBJECT);
    data
}

fn class(table: &TypeTable, name: &str, base: TypeId) -> TypeData {
    let mut data = TypeData::unknown(table.name(name));
    data.shape = TypeShape::Class;
    data.base = Some(base);
    data
}

/// `List<T>`.
pub(crate) fn instantiate_list(table: &mut TypeTable, args: &[TypeId]) -> TypeId {
    let element = args.first().copied().unwrap_or(TypeId::UNKNOWN);
    let enumerable = table.instantiate_name("IEnumerable", &[element]);
    let array = table.array_of(element);
    let mut data = class(table, "List", TypeId::OBJECT);
    data.args = vec![element];
    data.element = Some(element);
    data.interfaces.push(enumerable);
    let id = table.alloc(data);
    let members = vec![
        table.property("Count", TypeId::INT),
        table.method("Add", TypeId::VOID, vec![element], false),
        table.method("AddRange", TypeId::VOID, vec![enumerable], false),
        table.method("ToArray", array, vec![], false),
        table.method("Contains", TypeId::BOOL, vec![element], false),
        table.method("Slice", id, vec![TypeId::INT, TypeId::INT], false),
    ];
    table.data_mut(id).members = members;
    id
}

/// `IEnumerable<T>`.
pub(crate) fn instantiate_enumerable(table: &mut TypeTable, args: &[TypeId]) -> TypeId {
    let element = args.first().copied().unwrap_or(TypeId::UNKNOWN);
    let mut data = TypeData::unknown(table.name("IEnumerable"));
    data.shape = TypeShape::Interface;
    data.args = vec![element];
    data.element = Some(element);
    table.alloc(data)
}

/// `Func<..>` and `Action<..>`; `signature` ends with the return type.
pub(crate) fn instantiate_delegate(
    table: &mut TypeTable,
    name: &str,
    signature: Vec<TypeId>,
) -> TypeId {
    let (ret, params) = match signature.split_last() {
        Some((&ret, params)) => (ret, params.to_vec()),
        None => (TypeId::VOID, Vec::new()),
    };
    let invoke = table.method("Invoke", ret, params, false);
    let mut data = class(table, name, TypeId::OBJECT);
    data.shape = TypeShape::Delegate;
    data.args = signature;
    data.members.push(invoke);
    table.alloc(data)
}
